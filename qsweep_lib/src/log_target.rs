use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::identity::WorkerIdentity;

pub const HEADER_PREFIX: &str = "QSWEEP";

/// stable identifier of a command, used to name its log files
pub fn command_uid(command: &str) -> String {
    format!("{:x}", Sha256::digest(command.as_bytes()))
}

/// The pair of append-only log files owned by one command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogTargets {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

impl LogTargets {
    pub fn for_command(logs_dir: &Path, command: &str) -> Self {
        let uid = command_uid(command);
        Self {
            stdout: logs_dir.join(format!("{}.out", uid)),
            stderr: logs_dir.join(format!("{}.err", uid)),
        }
    }

    /// Opens both logs for appending and writes the launch header to each.
    /// The header says `Resumed` when the stdout log already has content.
    pub fn open(&self, identity: &WorkerIdentity, command: &str) -> io::Result<(File, File)> {
        let mut stdout = append(&self.stdout)?;
        let mut stderr = append(&self.stderr)?;
        let resumed = stdout.metadata()?.len() > 0;
        let header = header(resumed, &timestamp(), identity, command);
        stdout.write_all(header.as_bytes())?;
        stdout.flush()?;
        stderr.write_all(header.as_bytes())?;
        stderr.flush()?;
        Ok((stdout, stderr))
    }
}

fn append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn header(resumed: bool, timestamp: &str, identity: &WorkerIdentity, command: &str) -> String {
    let (lead, verb) = if resumed {
        ("\n", "Resumed")
    } else {
        ("", "Started")
    };
    format!(
        "{lead}## {prefix} - {verb} on: {timestamp} - In job: {job} - On nodes: {node} ##\n\
         ## {prefix} - Command: {command}\n",
        lead = lead,
        prefix = HEADER_PREFIX,
        verb = verb,
        timestamp = timestamp,
        job = identity.job_id,
        node = identity.node_name,
        command = command,
    )
}

/// local wall clock time, UTC when the local offset is unknown
fn timestamp() -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let now = OffsetDateTime::now_utc().to_offset(offset);
    now.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
