//! Inspect command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::InspectArgs;
use crate::model::{inspect, CheckpointSummary};

/// Header lines for a checkpoint summary
pub fn format_summary(summary: &CheckpointSummary) -> String {
    let config = &summary.config;
    let mut lines = vec![
        "Checkpoint Information:".to_string(),
        format!("  Backend: {}", config.name().unwrap_or("unknown")),
        format!("  Tensors: {}", summary.tensors.len()),
        format!("  Parameters: {:.3}M", summary.num_parameters() as f64 / 1e6),
    ];
    for key in ["hidden_size", "ffn_hidden_size", "num_attention_heads", "num_query_groups", "kv_channels", "num_layers"]
    {
        if let Ok(Some(value)) = config.usize_field(key) {
            lines.push(format!("  {key}: {value}"));
        }
    }
    for (key, value) in &summary.metadata {
        lines.push(format!("  {key}: {value}"));
    }
    lines.push(format!("  Tokenizer: {}", if summary.has_tokenizer { "yes" } else { "no (byte-level)" }));
    lines.join("\n")
}

pub fn run_inspect(args: InspectArgs, level: LogLevel) -> Result<(), String> {
    let summary = inspect(&args.checkpoint).map_err(|e| e.to_string())?;

    log(level, LogLevel::Normal, &format_summary(&summary));

    if level == LogLevel::Verbose {
        log(level, LogLevel::Verbose, "\nTensor Details:");
        for param in &summary.tensors {
            log(level, LogLevel::Verbose, &format!("  {param}"));
        }
    }

    Ok(())
}
