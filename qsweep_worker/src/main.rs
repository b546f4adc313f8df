use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use qsweep_lib::{logging, QueueStore, Worker, WorkerIdentity};
use structopt::StructOpt;
use tracing::info;

mod report;

#[derive(StructOpt, Debug)]
#[structopt(name = "qsweep-worker")]
enum Opt {
    /// Run commands from the shared queue until none is left
    Run {
        /// File containing all commands to execute, one per line
        #[structopt(name = "COMMANDS_FILE", parse(from_os_str))]
        commands_file: PathBuf,
        /// Folder receiving the stdout and stderr of every command
        #[structopt(name = "LOGS_DIR", parse(from_os_str))]
        logs_dir: PathBuf,
        /// Queue store, defaults to the commands file with a queue.json extension
        #[structopt(long, parse(from_os_str))]
        store: Option<PathBuf>,
    },
    /// Show how far the queue got
    Status {
        #[structopt(name = "COMMANDS_FILE", parse(from_os_str))]
        commands_file: PathBuf,
        #[structopt(long, parse(from_os_str))]
        store: Option<PathBuf>,
        /// Print every record as JSON
        #[structopt(long)]
        json: bool,
    },
}

fn store_for(commands_file: &Path, store: Option<PathBuf>) -> QueueStore {
    QueueStore::new(store.unwrap_or_else(|| commands_file.with_extension("queue.json")))
}

fn run(commands_file: &Path, logs_dir: &Path, store: QueueStore) -> anyhow::Result<()> {
    if !commands_file.is_file() {
        bail!("{} is not a file containing commands", commands_file.display());
    }
    if !logs_dir.is_dir() {
        bail!("{} is not a folder for command logs", logs_dir.display());
    }
    // seeding is idempotent, the first worker to get here creates the store
    store
        .seed(commands_file)
        .with_context(|| format!("could not seed {}", store.path().display()))?;
    let identity = WorkerIdentity::from_env();
    info!("worker {} using {}", identity, store.path().display());
    let executed = Worker::new(store, logs_dir, identity).run()?;
    info!("executed {} commands", executed);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init("info").map_err(anyhow::Error::msg)?;
    match Opt::from_args() {
        Opt::Run {
            commands_file,
            logs_dir,
            store,
        } => {
            let store = store_for(&commands_file, store);
            run(&commands_file, &logs_dir, store)
        }
        Opt::Status {
            commands_file,
            store,
            json,
        } => {
            let records = store_for(&commands_file, store).records()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                println!("{}", report::render(&records));
            }
            Ok(())
        }
    }
}
