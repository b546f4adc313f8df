use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

use anyhow::Context;
use qsweep_lib::{expand, pack, util::shell_quote, ExpandedJob, JobTemplate, QueueStore};
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::{
    config::LauncherConfig,
    layout::RunLayout,
    pbs::{PbsDirectives, Submitter},
};

/// Everything written for one launch.
#[derive(Debug)]
pub struct Launch {
    pub layout: RunLayout,
    pub units: Vec<PathBuf>,
    pub jobs: usize,
}

/// Expands and packs the template, then writes one unit script per batch.
/// Nothing is written when the template or the capacity is invalid.
#[instrument(skip_all, fields(queue = %config.queue, pool = config.pool))]
pub fn prepare(
    config: &LauncherConfig,
    template: &JobTemplate,
    workdir: &Path,
    now: OffsetDateTime,
) -> anyhow::Result<Launch> {
    let jobs = expand(template);
    let batches = pack(&jobs, config.cores_per_node)?;
    let layout = RunLayout::create(workdir, template, now)
        .with_context(|| format!("could not create run directory in {}", workdir.display()))?;
    info!("{} jobs in {} units under {}", jobs.len(), batches.len(), layout.root.display());

    let worker_command = if config.pool {
        Some(seed_pool(&layout, &jobs, &config.worker_bin)?)
    } else {
        None
    };
    let header = PbsDirectives {
        queue: config.queue.clone(),
        walltime: config.walltime.clone(),
        cuda: config.cuda,
    }
    .render_header();

    let mut units = Vec::with_capacity(batches.len());
    for batch in &batches {
        let body = match &worker_command {
            Some(command) => batch.render_workers(workdir, command),
            None => batch.render_jobs(workdir, &layout.root, false),
        };
        let path = layout.unit_path(batch.index);
        write_unit(&path, &format!("{}{}", header, body))?;
        units.push(path);
    }
    Ok(Launch {
        layout,
        units,
        jobs: jobs.len(),
    })
}

/// writes the command listing, seeds the queue next to it and returns the
/// worker invocation every unit starts
fn seed_pool(layout: &RunLayout, jobs: &[ExpandedJob], worker_bin: &str) -> anyhow::Result<String> {
    let commands_path = layout.commands_path();
    let mut listing: String = jobs.iter().map(|job| job.command.as_str()).collect::<Vec<_>>().join("\n");
    listing.push('\n');
    fs::write(&commands_path, listing)
        .with_context(|| format!("could not write {}", commands_path.display()))?;
    let logs = layout.worker_logs();
    fs::create_dir_all(&logs).with_context(|| format!("could not create {}", logs.display()))?;
    let store_path = layout.store_path();
    QueueStore::new(&store_path).seed(&commands_path)?;
    Ok(format!(
        "{} run {} {} --store {}",
        shell_quote(worker_bin),
        shell_quote(&commands_path.to_string_lossy()),
        shell_quote(&logs.to_string_lossy()),
        shell_quote(&store_path.to_string_lossy()),
    ))
}

fn write_unit(path: &Path, contents: &str) -> anyhow::Result<()> {
    fs::write(path, contents).with_context(|| format!("could not write {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("could not make {} executable", path.display()))?;
    Ok(())
}

/// submits every unit, stopping at the first rejection
pub fn submit_all(submitter: &Submitter, units: &[PathBuf]) -> anyhow::Result<Vec<String>> {
    units.iter().map(|unit| submitter.submit(unit)).collect()
}
