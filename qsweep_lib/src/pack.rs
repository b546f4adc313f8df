use std::{fmt::Write, path::Path};

use qsweep_data::ExpandedJob;
use tracing::{debug, instrument};

use crate::{error::PackError, util::shell_quote};

/// A contiguous run of expanded jobs destined for one dispatch unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchBatch {
    pub index: usize,
    pub jobs: Vec<ExpandedJob>,
}

impl DispatchBatch {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Script body that backgrounds every job with its combined output
    /// appended to `<log_dir>/<label>`. Waits for the jobs only if `wait`
    /// is set.
    ///
    /// Each job runs in a subshell so that a compound command (`a; b`,
    /// `a && b`, `a | b`) is redirected and backgrounded as a whole.
    pub fn render_jobs(&self, workdir: &Path, log_dir: &Path, wait: bool) -> String {
        let mut body = unit_prologue(workdir);
        for job in &self.jobs {
            let log = log_dir.join(&job.label);
            let _ = writeln!(
                body,
                "( {} ) >> {} 2>&1 &",
                job.command,
                shell_quote(&log.to_string_lossy())
            );
        }
        body.push_str(unit_epilogue(wait));
        body
    }

    /// Script body that starts one worker loop per job of the batch and waits
    /// for all of them; the workers pull their commands from the shared queue.
    pub fn render_workers(&self, workdir: &Path, worker_command: &str) -> String {
        let mut body = unit_prologue(workdir);
        for _ in &self.jobs {
            let _ = writeln!(body, "{} &", worker_command);
        }
        body.push_str(unit_epilogue(true));
        body
    }
}

fn unit_prologue(workdir: &Path) -> String {
    format!("cd {}\n\n", shell_quote(&workdir.to_string_lossy()))
}

fn unit_epilogue(wait: bool) -> &'static str {
    if wait {
        "\nwait\n"
    } else {
        "\n#wait\n"
    }
}

/// Partitions jobs into the fewest batches holding at most `capacity` jobs
/// each, with batch sizes differing by at most one.
///
/// The first `n % count` batches take the extra job, so 10 jobs with a
/// capacity of 3 pack as 3, 3, 2, 2.
#[instrument(skip(jobs), fields(total = jobs.len()))]
pub fn pack(jobs: &[ExpandedJob], capacity: usize) -> Result<Vec<DispatchBatch>, PackError> {
    if capacity == 0 {
        return Err(PackError::ZeroCapacity);
    }
    let total = jobs.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let count = (total + capacity - 1) / capacity;
    let base = total / count;
    let extra = total % count;

    let mut batches = Vec::with_capacity(count);
    let mut start = 0;
    for index in 0..count {
        let size = if index < extra { base + 1 } else { base };
        batches.push(DispatchBatch {
            index,
            jobs: jobs[start..start + size].to_vec(),
        });
        start += size;
    }
    debug!("packed {} jobs into {} batches", total, count);
    Ok(batches)
}
