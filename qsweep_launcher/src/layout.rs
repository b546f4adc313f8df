use std::{
    fs, io,
    path::{Path, PathBuf},
};

use qsweep_lib::{
    util::{tail_chars, truncate_chars},
    JobTemplate,
};
use time::{macros::format_description, OffsetDateTime};

pub const LOGS_ROOT: &str = "LOGS_QSUB";
pub const UNITS_DIR: &str = "QSUB_commands";

const NAME_SEGMENT_LEN: usize = 30;
const NAME_MAX_LEN: usize = 227;

/// Short name of a sweep: per axis the tail of its first value and, when it
/// has several, of its last one, reduced to the last path component.
pub fn run_name(template: &JobTemplate) -> String {
    let parts: Vec<String> = template
        .axes()
        .iter()
        .filter(|axis| !axis.is_empty())
        .map(|axis| {
            let first = tail_chars(&axis[0], NAME_SEGMENT_LEN);
            let part = if axis.len() == 1 {
                first.to_string()
            } else {
                format!("{}-{}", first, tail_chars(&axis[axis.len() - 1], NAME_SEGMENT_LEN))
            };
            part.rsplit('/').next().unwrap_or_default().to_string()
        })
        .collect();
    truncate_chars(&parts.join("__"), NAME_MAX_LEN).to_string()
}

/// Directories of one launch:
/// `LOGS_QSUB/<timestamp>___<run name>/` holding job logs, with the unit
/// scripts in `QSUB_commands/`.
#[derive(Clone, Debug)]
pub struct RunLayout {
    pub root: PathBuf,
    pub units_dir: PathBuf,
}

impl RunLayout {
    pub fn create(base: &Path, template: &JobTemplate, now: OffsetDateTime) -> io::Result<Self> {
        let stamp = now
            .format(format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]"
            ))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let root = base
            .join(LOGS_ROOT)
            .join(format!("{}___{}", stamp, run_name(template)));
        let units_dir = root.join(UNITS_DIR);
        fs::create_dir_all(&units_dir)?;
        Ok(Self { root, units_dir })
    }

    pub fn unit_path(&self, index: usize) -> PathBuf {
        self.units_dir.join(format!("jobCommands_{}.sh", index))
    }

    pub fn commands_path(&self) -> PathBuf {
        self.root.join("commands.txt")
    }

    pub fn store_path(&self) -> PathBuf {
        self.root.join("commands.queue.json")
    }

    pub fn worker_logs(&self) -> PathBuf {
        self.root.join("worker_logs")
    }
}
