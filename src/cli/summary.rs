use ms_sentry::monitor::{MonitorOutcome, MonitorReport};

#[cfg(feature = "colorized_output")]
use console::style;

#[cfg_attr(feature = "colorized_output", allow(dead_code))]
pub fn format_plain(report: &MonitorReport) -> String {
    let mut output = String::new();
    output.push_str("ms-sentry Session Summary\n");
    output.push_str("=========================\n");
    output.push_str(&format!("Session: {}\n", report.session_id));
    output.push_str(&format!("Files: {}\n", report));
    for dir in &report.checkpoints {
        output.push_str(&format!("Checkpoint: {}\n", dir.display()));
    }
    if let Some(dir) = &report.final_export {
        output.push_str(&format!("Final export: {}\n", dir.display()));
    }
    match &report.outcome {
        MonitorOutcome::Aborted { file, reason } => {
            output.push_str(&format!("ABORTED on {}: {}\n", file.display(), reason));
        }
        MonitorOutcome::Done => output.push_str("DONE\n"),
        MonitorOutcome::InProgress => output.push_str("IN PROGRESS\n"),
    }
    output
}

#[cfg(feature = "colorized_output")]
pub fn format_colored(report: &MonitorReport) -> String {
    use console::Emoji;

    static OK: Emoji<'_, '_> = Emoji("✓", "[OK]");
    static FAIL: Emoji<'_, '_> = Emoji("✗", "[FAIL]");

    let mut output = String::new();
    output.push_str(&format!("{}\n", style("ms-sentry Session Summary").bold().cyan()));
    output.push_str(&format!("{}\n", style("=========================").cyan()));
    output.push_str(&format!("{}: {}\n", style("Session").bold(), report.session_id));
    output.push_str(&format!(
        "{}: {} processed, {} skipped, {} failed\n",
        style("Files").bold(),
        style(report.processed.len()).green(),
        style(report.skipped.len()).yellow(),
        style(report.failed.len()).red()
    ));
    for dir in &report.checkpoints {
        output.push_str(&format!("{}: {}\n", style("Checkpoint").bold(), dir.display()));
    }
    if let Some(dir) = &report.final_export {
        output.push_str(&format!("{}: {}\n", style("Final export").bold(), dir.display()));
    }

    match &report.outcome {
        MonitorOutcome::Aborted { file, reason } => {
            output.push_str(&format!(
                "[{}] {} on {}: {}\n",
                FAIL,
                style("ABORTED").red().bold(),
                file.display(),
                reason
            ));
        }
        MonitorOutcome::Done => {
            output.push_str(&format!("[{}] {}\n", OK, style("DONE").green().bold()));
        }
        MonitorOutcome::InProgress => output.push_str("IN PROGRESS\n"),
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn test_plain_summary_names_abort_file() {
        let report = MonitorReport {
            session_id: Uuid::nil(),
            outcome: MonitorOutcome::Aborted {
                file: PathBuf::from("run_7.raw"),
                reason: "Data collected in run_7.raw is not centroid, check method".into(),
            },
            checkpoints: vec![PathBuf::from("qc_output_5")],
            final_export: None,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };
        let text = format_plain(&report);
        assert!(text.contains("ABORTED on run_7.raw"));
        assert!(text.contains("Checkpoint: qc_output_5"));
        assert!(!text.contains("Final export"));
    }
}
