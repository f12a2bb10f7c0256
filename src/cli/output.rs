//! Output formatting for CLI

use archive_stats::ingest::progress::format_number;
use archive_stats::{KindOutcome, PipelineReport, WalkReport};

/// Summary of one snapshot's run
pub fn format_pipeline_report(report: &PipelineReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\nSnapshot {} ({}):\n",
        report.data_date,
        report.duration_formatted()
    ));
    for kind in &report.kinds {
        match &kind.outcome {
            KindOutcome::Completed(stats) => {
                let marker = if stats.is_clean() { "✅" } else { "⚠️ " };
                output.push_str(&format!(
                    "  {marker} {:<10} {} ok, {} errors",
                    kind.kind.name(),
                    format_number(stats.success as u64),
                    format_number(stats.errors as u64)
                ));
                if stats.malformed_lines > 0 {
                    output.push_str(&format!(", {} malformed lines", stats.malformed_lines));
                }
                if stats.failed_batches > 0 {
                    output.push_str(&format!(", {} failed batches", stats.failed_batches));
                }
                output.push('\n');
            }
            KindOutcome::Failed { error } => {
                output.push_str(&format!("  ❌ {:<10} {}\n", kind.kind.name(), error));
            }
        }
    }

    output.push_str(&format!(
        "Processed {}/{} entity kinds\n",
        report.completed_count(),
        report.kinds.len()
    ));
    output
}

/// Summary of a backfill walk
pub fn format_walk_report(report: &WalkReport) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\nWalk {}: {} checkpoint(s)\n",
        report.run_id,
        report.checkpoints.len()
    ));
    for (checkpoint, pipeline) in &report.checkpoints {
        let marker = if pipeline.is_success() { "✅" } else { "⚠️ " };
        output.push_str(&format!(
            "  {marker} {} {} {} ok, {} errors\n",
            checkpoint.date,
            checkpoint.short_id(),
            format_number(pipeline.total_success() as u64),
            format_number(pipeline.total_errors() as u64)
        ));
    }

    let partial = report.partial_failures();
    if partial.is_empty() {
        output.push_str("\n✅ All checkpoints processed\n");
    } else {
        output.push_str(&format!(
            "\n⚠️  {} checkpoint(s) partially failed\n",
            partial.len()
        ));
    }
    output
}
