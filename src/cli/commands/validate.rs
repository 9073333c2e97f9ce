//! Validate command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_spec, validate_spec, PruneJobSpec, ValidateArgs};
use crate::prune::data_loader::CalibrationSource;

/// Format model group as a string
pub fn format_model_info(spec: &PruneJobSpec) -> String {
    let mut lines = vec![
        format!("  Restore from: {}", spec.model.restore_from_path.display()),
        format!(
            "  Parallelism: tensor={} pipeline={}",
            spec.model.tensor_model_parallel_size, spec.model.pipeline_model_parallel_size
        ),
    ];
    if !spec.model.overrides.is_empty() {
        let keys: Vec<&str> = spec.model.overrides.keys().map(String::as_str).collect();
        lines.push(format!("  Config overrides: {}", keys.join(", ")));
    }
    lines.join("\n")
}

/// Format trainer group as a string
pub fn format_trainer_info(spec: &PruneJobSpec) -> String {
    let trainer = &spec.trainer;
    let mut lines = vec![
        format!("  Accelerator: {:?}", trainer.accelerator),
        format!("  Devices: {} x {} node(s)", trainer.devices, trainer.num_nodes),
        format!("  Precision: {:?}", trainer.precision),
    ];
    if let Some(threads) = trainer.num_threads {
        lines.push(format!("  Worker threads: {threads}"));
    }
    lines.join("\n")
}

/// Format calibration data and targets as a string
pub fn format_prune_info(spec: &PruneJobSpec) -> String {
    let prune = &spec.prune;
    let source = CalibrationSource::parse(&prune.calib_dataset);
    [
        format!("  Calibration data: {source}"),
        format!("  Calibration size: {}", prune.num_calib_size),
        format!(
            "  Batch size: {} (max {} chars)",
            spec.inference.batch_size, spec.inference.max_context_length
        ),
        format!("  Target ffn_hidden_size: {}", prune.ffn_hidden_size),
        format!("  Target num_attention_heads: {}", prune.num_attention_heads),
        format!("  Target num_query_groups: {}", prune.num_query_groups),
    ]
    .join("\n")
}

/// Format export group as a string
pub fn format_export_info(spec: &PruneJobSpec) -> String {
    format!(
        "  Save path: {}\n  Decoder type: {}\n  Inference TP: {}",
        spec.export.save_path.display(),
        spec.export.decoder_type,
        spec.export.inference_tensor_parallel
    )
}

/// Print detailed configuration summary
pub fn print_detailed_summary(spec: &PruneJobSpec) {
    println!();
    println!("Configuration Summary:");
    println!("{}", format_model_info(spec));
    println!();
    println!("{}", format_trainer_info(spec));
    println!();
    println!("{}", format_prune_info(spec));
    println!();
    println!("{}", format_export_info(spec));
}

pub fn run_validate(args: ValidateArgs, level: LogLevel) -> Result<(), String> {
    log(level, LogLevel::Normal, &format!("Validating config: {}", args.config.display()));

    let spec = load_spec(&args.config, &args.overrides).map_err(|e| format!("Config error: {e}"))?;

    validate_spec(&spec).map_err(|e| format!("Validation failed: {e}"))?;

    log(level, LogLevel::Normal, "Configuration is valid");

    if args.detailed {
        print_detailed_summary(&spec);
    }

    Ok(())
}
