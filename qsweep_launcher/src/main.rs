use std::env;

use anyhow::Context;
use qsweep_lib::{logging, JobTemplate};
use structopt::{clap::AppSettings, StructOpt};
use time::{OffsetDateTime, UtcOffset};
use tracing::info;

use crate::{config::LauncherConfig, pbs::Submitter};

mod config;
mod layout;
mod operations;
mod pbs;

/// Expands a command template into every combination of its values and
/// spreads the resulting jobs over batch queue submissions.
///
/// Each trailing argument is one position of the command; quote it to give
/// several whitespace separated values, e.g.
/// `qsweep-launcher python "train.py" "0.1 0.01" "relu tanh"`.
#[derive(StructOpt, Debug)]
#[structopt(name = "qsweep-launcher", setting = AppSettings::TrailingVarArg)]
struct Opt {
    /// Queue used (ex: qwork@mp2, qfat256@mp2, qfat512@mp2)
    #[structopt(short, long, default_value = "qwork@mp2")]
    queue: String,

    /// Walltime requested for each submission
    #[structopt(short = "t", long = "time", default_value = "5:00:00:00")]
    walltime: String,

    /// Jobs per node, 48 on the fat queues and 24 elsewhere when unset
    #[structopt(short = "n", long = "cores")]
    cores: Option<usize>,

    /// Load the cuda module before running the jobs
    #[structopt(short, long)]
    cuda: bool,

    /// Write the submission files without submitting them
    #[structopt(short = "x", long = "do-not-launch")]
    do_not_launch: bool,

    /// Seed a shared command queue and submit worker loops instead of the jobs themselves
    #[structopt(long)]
    pool: bool,

    /// Worker executable started by pool units
    #[structopt(long, default_value = "qsweep-worker")]
    worker_bin: String,

    #[structopt(name = "COMMAND_AND_OPTIONS", required = true, allow_hyphen_values = true)]
    command_and_options: Vec<String>,
}

impl From<&Opt> for LauncherConfig {
    fn from(opt: &Opt) -> Self {
        let mut config = LauncherConfig::new(&opt.queue, &opt.walltime, opt.cores);
        config.cuda = opt.cuda;
        config.submit = !opt.do_not_launch;
        config.pool = opt.pool;
        config.worker_bin = opt.worker_bin.clone();
        config
    }
}

fn main() -> anyhow::Result<()> {
    // read before any thread exists, the local offset is unavailable afterwards
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    logging::init("info").map_err(anyhow::Error::msg)?;
    let opt = Opt::from_args();
    let config = LauncherConfig::from(&opt);

    let template = JobTemplate::parse(&opt.command_and_options)?;
    let workdir = env::current_dir().context("could not read the current directory")?;
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let launch = operations::prepare(&config, &template, &workdir, now)?;
    println!("{}", launch.layout.root.display());

    if config.submit {
        let job_ids = operations::submit_all(&Submitter::default(), &launch.units)?;
        info!("submitted {} units", job_ids.len());
        for job_id in job_ids {
            println!("{}", job_id);
        }
    } else {
        info!("{} jobs written to {} units, not submitted", launch.jobs, launch.units.len());
    }
    Ok(())
}
