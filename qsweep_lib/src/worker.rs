use std::{
    os::unix::process::ExitStatusExt,
    path::PathBuf,
    process::{Command, ExitStatus, Stdio},
};

use qsweep_data::CommandRecord;
use tracing::{error, info, instrument, warn};

use crate::{
    error::QueueError, identity::WorkerIdentity, log_target::LogTargets, queue::CommandQueue,
};

/// exit code recorded when the shell could not be started
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;
/// exit code recorded when the command was not run because its log files
/// could not be opened; no process can exit with it
pub const LOGS_UNAVAILABLE_EXIT_CODE: i32 = -1;

const DEFAULT_SHELL: &str = "sh";

/// How one command ended. Every outcome is reported to the queue as an exit
/// code and the worker moves on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Exited { exit_code: i32 },
    Signaled { signal: i32 },
    SpawnFailed { msg: String },
    LogsUnavailable { msg: String },
}

impl Outcome {
    fn from_status(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(exit_code), _) => Outcome::Exited { exit_code },
            (None, Some(signal)) => Outcome::Signaled { signal },
            (None, None) => Outcome::SpawnFailed {
                msg: format!("unexpected exit status: {:?}", status),
            },
        }
    }

    /// exit code as a shell would report it
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Exited { exit_code } => *exit_code,
            Outcome::Signaled { signal } => 128 + signal,
            Outcome::SpawnFailed { .. } => SPAWN_FAILURE_EXIT_CODE,
            Outcome::LogsUnavailable { .. } => LOGS_UNAVAILABLE_EXIT_CODE,
        }
    }
}

enum WorkerState {
    Fetching,
    Executing(CommandRecord),
    Drained,
}

/// One worker loop: claims commands from the queue one at a time, runs
/// each through the shell with output appended to its log files, and
/// reports the exit code, until nothing is left to claim.
pub struct Worker<Q> {
    queue: Q,
    logs_dir: PathBuf,
    identity: WorkerIdentity,
    shell: String,
}

impl<Q: CommandQueue> Worker<Q> {
    pub fn new(queue: Q, logs_dir: impl Into<PathBuf>, identity: WorkerIdentity) -> Self {
        Self {
            queue,
            logs_dir: logs_dir.into(),
            identity,
            shell: DEFAULT_SHELL.to_string(),
        }
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }

    /// Runs until the queue is drained and returns how many commands this
    /// worker executed. Failing commands do not stop the loop; only queue
    /// errors do.
    #[instrument(skip(self), fields(worker = %self.identity))]
    pub fn run(&self) -> Result<usize, QueueError> {
        let claimant = self.identity.to_string();
        let mut executed = 0;
        let mut state = WorkerState::Fetching;
        loop {
            state = match state {
                WorkerState::Fetching => match self.queue.claim(&claimant)? {
                    Some(record) => WorkerState::Executing(record),
                    None => WorkerState::Drained,
                },
                WorkerState::Executing(record) => {
                    let outcome = self.execute(&record.command);
                    self.queue.complete(&record.command, outcome.exit_code())?;
                    executed += 1;
                    WorkerState::Fetching
                }
                WorkerState::Drained => {
                    info!("queue drained after {} commands", executed);
                    return Ok(executed);
                }
            };
        }
    }

    /// Runs one command to completion, blocking the loop meanwhile.
    /// A command whose logs cannot be opened is not run.
    #[instrument(skip(self))]
    pub fn execute(&self, command: &str) -> Outcome {
        let targets = LogTargets::for_command(&self.logs_dir, command);
        let (stdout, stderr) = match targets.open(&self.identity, command) {
            Ok((stdout, stderr)) => (Stdio::from(stdout), Stdio::from(stderr)),
            Err(err) => {
                error!("could not open logs in {:?}, command not run: {}", self.logs_dir, err);
                return Outcome::LogsUnavailable {
                    msg: err.to_string(),
                };
            }
        };
        info!("running command");
        let outcome = match Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
        {
            Ok(status) => Outcome::from_status(status),
            Err(err) => Outcome::SpawnFailed {
                msg: err.to_string(),
            },
        };
        match &outcome {
            Outcome::Exited { exit_code: 0 } => info!("command succeeded"),
            Outcome::SpawnFailed { msg } => error!("could not start {}: {}", self.shell, msg),
            outcome => warn!("command failed: {:?}", outcome),
        }
        outcome
    }
}
