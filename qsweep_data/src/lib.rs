use std::iter::FromIterator;

use serde::{Deserialize, Serialize};

/// One fully concrete command produced by expanding a job template,
/// with the short label used to name its output on disk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedJob {
    pub command: String,
    pub label: String,
}

impl ExpandedJob {
    pub fn new(command: &str, label: &str) -> Self {
        Self {
            command: command.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandState {
    Pending,
    Running,
    Finished,
}

/// A command as tracked by the shared queue.
/// The command string is the record's identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub state: CommandState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimant: Option<String>,
}

impl CommandRecord {
    pub fn pending(command: &str) -> Self {
        Self {
            command: command.to_string(),
            state: CommandState::Pending,
            exit_code: None,
            claimant: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.state == CommandState::Pending
    }

    pub fn is_running(&self) -> bool {
        self.state == CommandState::Running
    }

    /// finished with a non-zero exit code
    pub fn has_failed(&self) -> bool {
        self.state == CommandState::Finished && self.exit_code.map_or(false, |code| code != 0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSummary {
    pub pending: usize,
    pub running: usize,
    pub finished: usize,
    pub failed: usize,
}

impl QueueSummary {
    pub fn total(&self) -> usize {
        self.pending + self.running + self.finished
    }

    /// every command ran to completion and nothing is left claimed
    pub fn is_complete(&self) -> bool {
        self.pending == 0 && self.running == 0
    }
}

impl<'a> FromIterator<&'a CommandRecord> for QueueSummary {
    fn from_iter<I: IntoIterator<Item = &'a CommandRecord>>(records: I) -> Self {
        let mut summary = QueueSummary::default();
        for record in records {
            match record.state {
                CommandState::Pending => summary.pending += 1,
                CommandState::Running => summary.running += 1,
                CommandState::Finished => {
                    summary.finished += 1;
                    if record.has_failed() {
                        summary.failed += 1;
                    }
                }
            }
        }
        summary
    }
}
