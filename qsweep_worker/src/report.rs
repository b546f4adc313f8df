use qsweep_data::{CommandRecord, QueueSummary};
use qsweep_lib::LOGS_UNAVAILABLE_EXIT_CODE;

/// human readable state of the queue, listing what needs attention
pub fn render(records: &[CommandRecord]) -> String {
    let summary: QueueSummary = records.iter().collect();
    let mut lines = vec![format!(
        "{} commands: {} pending, {} running, {} finished ({} failed)",
        summary.total(),
        summary.pending,
        summary.running,
        summary.finished,
        summary.failed
    )];
    let running: Vec<String> = records
        .iter()
        .filter(|record| record.is_running())
        .map(|record| {
            format!(
                "  {} [{}]",
                record.command,
                record.claimant.as_deref().unwrap_or("unknown")
            )
        })
        .collect();
    if !running.is_empty() {
        lines.push("running (stuck if no worker is alive):".to_string());
        lines.extend(running);
    }
    let failed: Vec<String> = records
        .iter()
        .filter(|record| record.has_failed())
        .map(|record| match record.exit_code {
            Some(LOGS_UNAVAILABLE_EXIT_CODE) => {
                format!("  {} [not run, logs unavailable]", record.command)
            }
            code => format!("  {} [exit {}]", record.command, code.unwrap_or_default()),
        })
        .collect();
    if !failed.is_empty() {
        lines.push("failed:".to_string());
        lines.extend(failed);
    }
    lines.join("\n")
}

#[cfg(test)]
mod test {
    use qsweep_data::{CommandRecord, CommandState};

    use super::render;
    use qsweep_lib::LOGS_UNAVAILABLE_EXIT_CODE;

    #[test]
    fn test_render_lists_running_and_failed() {
        let mut running = CommandRecord::pending("sleep 100");
        running.state = CommandState::Running;
        running.claimant = Some("12.mp2@node-3".to_string());
        let mut failed = CommandRecord::pending("false");
        failed.state = CommandState::Finished;
        failed.exit_code = Some(1);
        let mut ok = CommandRecord::pending("true");
        ok.state = CommandState::Finished;
        ok.exit_code = Some(0);

        assert_eq!(
            "4 commands: 1 pending, 1 running, 2 finished (1 failed)\n\
             running (stuck if no worker is alive):\n  sleep 100 [12.mp2@node-3]\n\
             failed:\n  false [exit 1]",
            render(&[running, failed, ok, CommandRecord::pending("ls")])
        );
    }

    #[test]
    fn test_render_marks_commands_skipped_for_logs() {
        let mut skipped = CommandRecord::pending("make all");
        skipped.state = CommandState::Finished;
        skipped.exit_code = Some(LOGS_UNAVAILABLE_EXIT_CODE);
        assert_eq!(
            "1 commands: 0 pending, 0 running, 1 finished (1 failed)\n\
             failed:\n  make all [not run, logs unavailable]",
            render(&[skipped])
        );
    }

    #[test]
    fn test_render_complete_queue() {
        let mut ok = CommandRecord::pending("true");
        ok.state = CommandState::Finished;
        ok.exit_code = Some(0);
        assert_eq!(
            "1 commands: 0 pending, 0 running, 1 finished (0 failed)",
            render(&[ok])
        );
    }
}
