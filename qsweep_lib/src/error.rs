use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("job template has no axes")]
    NoAxes,
    #[error("axis {0} of the job template has no values")]
    EmptyAxis(usize),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PackError {
    #[error("jobs per dispatch unit must be at least 1")]
    ZeroCapacity,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("corrupt queue store {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported queue store version {0}")]
    UnsupportedVersion(u32),
    #[error("could not lock {path} after {attempts} attempts: {errno}")]
    Lock {
        path: PathBuf,
        attempts: u32,
        errno: nix::errno::Errno,
    },
    #[error("command is not known to the queue: {0}")]
    UnknownCommand(String),
    #[error("command is not running: {0}")]
    NotRunning(String),
}

impl QueueError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| QueueError::Io { path, source }
    }
}
