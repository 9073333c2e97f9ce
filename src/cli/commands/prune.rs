//! Prune command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_spec, validate_spec, PruneArgs};
use crate::prune::{ExportConstraints, PruneOutcome, PrunePipeline};
use crate::runtime::Runtime;

/// Format a width as `ffn/heads/groups`
pub fn format_width(width: &ExportConstraints) -> String {
    format!(
        "ffn_hidden_size={} num_attention_heads={} num_query_groups={}",
        width.ffn_hidden_size, width.num_attention_heads, width.num_query_groups
    )
}

/// Summary printed after a successful job
pub fn format_outcome(outcome: &PruneOutcome) -> String {
    let metrics = &outcome.metrics;
    let mut lines = vec![
        format!("Pruning complete ({})", outcome.report.mode.display_name()),
        format!("  Before: {}", format_width(&outcome.report.original)),
        format!("  After:  {}", format_width(&outcome.report.pruned)),
        format!(
            "  Parameters: {} -> {} ({:.1}% kept)",
            metrics.parameters_before,
            metrics.parameters_after,
            metrics.retained_fraction() * 100.0
        ),
        format!(
            "  Calibration: {} batches, {} samples",
            metrics.calibration_batches, metrics.calibration_samples
        ),
    ];
    lines.push(format!("  Saved to: {}", outcome.save_path.display()));
    lines.push(format!("  Total time: {:.2}s", metrics.total_duration_secs()));
    lines.join("\n")
}

pub fn run_prune(args: PruneArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Loading job: {}", args.config.display()));

    let spec = load_spec(&args.config, &args.overrides).map_err(|e| format!("Config error: {e}"))?;
    validate_spec(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    // worker pool first: nothing is restored or fetched until it exists
    let runtime = Runtime::for_job(&spec.trainer).map_err(|e| e.to_string())?;
    let outcome = PrunePipeline::new(&spec, level).run(&runtime).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, &format_outcome(&outcome));
    for (stage, secs) in &outcome.metrics.stage_durations {
        log(level, LogLevel::Verbose, &format!("  {}: {secs:.2}s", stage.display_name()));
    }
    Ok(())
}
