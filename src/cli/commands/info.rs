//! Info command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{load_spec, InfoArgs, OutputFormat};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<(), String> {
    let spec = load_spec(&args.config, &args.overrides).map_err(|e| format!("Config error: {e}"))?;

    match args.format {
        OutputFormat::Text => {
            log(level, LogLevel::Normal, "Configuration Info:");
            println!();
            println!("Restore from: {}", spec.model.restore_from_path.display());
            println!("Calibration data: {} ({} samples)", spec.prune.calib_dataset, spec.prune.num_calib_size);
            println!(
                "Targets: ffn_hidden_size={} num_attention_heads={} num_query_groups={}",
                spec.prune.ffn_hidden_size, spec.prune.num_attention_heads, spec.prune.num_query_groups
            );
            println!("Save path: {}", spec.export.save_path.display());

            if let Some(cache) = &spec.data.cache_dir {
                println!("Hub cache: {}", cache.display());
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&spec)
                .map_err(|e| format!("JSON serialization error: {e}"))?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&spec)
                .map_err(|e| format!("YAML serialization error: {e}"))?;
            println!("{yaml}");
        }
    }

    Ok(())
}
