use std::{path::Path, process::Command};

use anyhow::{bail, Context};
use tracing::{info, instrument};

/// Batch queue directives written at the top of every dispatch unit.
///
/// A unit asks for a single processor; how many jobs it carries is decided
/// when packing, not by the queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PbsDirectives {
    pub queue: String,
    pub walltime: String,
    pub cuda: bool,
}

impl PbsDirectives {
    pub fn render_header(&self) -> String {
        let cuda = if self.cuda { "" } else { "#" };
        format!(
            "#!/bin/bash\n\
             #PBS -q {queue}\n\
             #PBS -l nodes=1:ppn=1\n\
             #--Exporting environment variables from the submission shell to the job shell\n\
             #PBS -V\n\
             #PBS -l walltime={walltime}\n\
             {cuda}module load cuda\n\
             \n",
            queue = self.queue,
            walltime = self.walltime,
            cuda = cuda,
        )
    }
}

/// Hands unit scripts to the batch queue.
pub struct Submitter {
    program: String,
}

impl Default for Submitter {
    fn default() -> Self {
        Self::new("qsub")
    }
}

impl Submitter {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    /// submits one unit and returns what the queue printed, usually the job id
    #[instrument(skip(self))]
    pub fn submit(&self, unit: &Path) -> anyhow::Result<String> {
        let output = Command::new(&self.program)
            .arg(unit)
            .output()
            .with_context(|| format!("could not run {}", self.program))?;
        if !output.status.success() {
            bail!(
                "{} rejected {}: {}",
                self.program,
                unit.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let job_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("submitted as {}", job_id);
        Ok(job_id)
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use super::{PbsDirectives, Submitter};

    #[test]
    fn test_render_header() {
        let directives = PbsDirectives {
            queue: "qwork@mp2".to_string(),
            walltime: "1:00:00".to_string(),
            cuda: false,
        };
        let header = directives.render_header();
        assert!(header.starts_with("#!/bin/bash\n#PBS -q qwork@mp2\n#PBS -l nodes=1:ppn=1\n"));
        assert!(header.contains("#PBS -V\n#PBS -l walltime=1:00:00\n#module load cuda\n"));

        let cuda = PbsDirectives { cuda: true, ..directives };
        assert!(cuda.render_header().contains("\nmodule load cuda\n"));
    }

    #[test]
    fn test_submit_reports_job_id() {
        let job_id = Submitter::new("echo").submit(Path::new("unit.sh")).unwrap();
        assert_eq!("unit.sh", job_id);
    }

    #[test]
    fn test_submit_failure_is_an_error() {
        assert!(Submitter::new("false").submit(Path::new("unit.sh")).is_err());
        assert!(Submitter::new("/nonexistent/qsub")
            .submit(Path::new("unit.sh"))
            .is_err());
    }
}
