use std::{
    collections::HashSet,
    fs,
    io,
    path::{Path, PathBuf},
};

use qsweep_data::{CommandRecord, CommandState, QueueSummary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    error::QueueError,
    util::{sibling, write_atomic, FileLock},
};

const STORE_VERSION: u32 = 1;

/// The claim/complete protocol workers speak to the shared backlog.
pub trait CommandQueue {
    /// Atomically takes the first pending command and marks it running.
    /// `None` means nothing is left to claim.
    fn claim(&self, claimant: &str) -> Result<Option<CommandRecord>, QueueError>;

    /// Atomically marks a running command finished with its exit code.
    fn complete(&self, command: &str, exit_code: i32) -> Result<(), QueueError>;
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    commands: Vec<CommandRecord>,
}

/// Command queue persisted as a JSON file on a filesystem shared by all
/// workers.
///
/// Every read-modify-write runs under an exclusive `flock` on `<store>.lock`
/// and replaces the store with a rename, so workers on any host see either
/// the old or the new state. Handles are cheap: each worker opens its own.
#[derive(Clone, Debug)]
pub struct QueueStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl QueueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock_path = sibling(&path, "lock");
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds every command listed in `commands_path` (one per line) that the
    /// store does not know yet. Returns how many were added.
    #[instrument(skip(self), fields(store = ?self.path))]
    pub fn seed(&self, commands_path: &Path) -> Result<usize, QueueError> {
        let listing = fs::read_to_string(commands_path).map_err(QueueError::io(commands_path))?;
        self.seed_commands(listing.lines())
    }

    /// Adds commands as pending, keeping the state of those already present,
    /// so seeding an interrupted run again resumes it.
    pub fn seed_commands<I, S>(&self, commands: I) -> Result<usize, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = self.transact(|records| {
            let mut known: HashSet<String> = records.iter().map(|r| r.command.clone()).collect();
            let before = records.len();
            for command in commands {
                let command = command.as_ref().trim();
                if command.is_empty() {
                    continue;
                }
                if known.insert(command.to_string()) {
                    records.push(CommandRecord::pending(command));
                } else {
                    debug!("skipping known command: {}", command);
                }
            }
            let added = records.len() - before;
            Ok((added, added > 0 || before == 0))
        })?;
        info!("seeded {} new commands", added);
        Ok(added)
    }

    /// snapshot of every record in seed order
    pub fn records(&self) -> Result<Vec<CommandRecord>, QueueError> {
        let _lock = FileLock::acquire(&self.lock_path)?;
        self.load()
    }

    pub fn summary(&self) -> Result<QueueSummary, QueueError> {
        Ok(self.records()?.iter().collect())
    }

    /// runs `f` on the records under the lock, saving them if it asks to
    fn transact<T, F>(&self, f: F) -> Result<T, QueueError>
    where
        F: FnOnce(&mut Vec<CommandRecord>) -> Result<(T, bool), QueueError>,
    {
        let _lock = FileLock::acquire(&self.lock_path)?;
        let mut records = self.load()?;
        let (result, dirty) = f(&mut records)?;
        if dirty {
            self.save(records)?;
        }
        Ok(result)
    }

    fn load(&self) -> Result<Vec<CommandRecord>, QueueError> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(QueueError::io(&self.path)(err)),
        };
        let store: StoreFile =
            serde_json::from_slice(&contents).map_err(|source| QueueError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        if store.version != STORE_VERSION {
            return Err(QueueError::UnsupportedVersion(store.version));
        }
        Ok(store.commands)
    }

    fn save(&self, commands: Vec<CommandRecord>) -> Result<(), QueueError> {
        let store = StoreFile {
            version: STORE_VERSION,
            commands,
        };
        let contents = serde_json::to_vec_pretty(&store).map_err(|source| QueueError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &contents).map_err(QueueError::io(&self.path))
    }
}

impl CommandQueue for QueueStore {
    #[instrument(skip(self))]
    fn claim(&self, claimant: &str) -> Result<Option<CommandRecord>, QueueError> {
        let claimed = self.transact(|records| {
            match records.iter_mut().find(|record| record.is_pending()) {
                Some(record) => {
                    record.state = CommandState::Running;
                    record.claimant = Some(claimant.to_string());
                    Ok((Some(record.clone()), true))
                }
                None => Ok((None, false)),
            }
        })?;
        match &claimed {
            Some(record) => debug!("claimed command: {}", record.command),
            None => debug!("no pending command left"),
        }
        Ok(claimed)
    }

    #[instrument(skip(self))]
    fn complete(&self, command: &str, exit_code: i32) -> Result<(), QueueError> {
        self.transact(|records| {
            let record = records
                .iter_mut()
                .find(|record| record.command == command)
                .ok_or_else(|| QueueError::UnknownCommand(command.to_string()))?;
            if !record.is_running() {
                warn!("refusing to complete command in state {:?}", record.state);
                return Err(QueueError::NotRunning(command.to_string()));
            }
            record.state = CommandState::Finished;
            record.exit_code = Some(exit_code);
            Ok(((), true))
        })
    }
}
