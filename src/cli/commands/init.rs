//! Init command implementation

use crate::cli::logging::log;
use crate::cli::LogLevel;
use crate::config::{InitArgs, DEFAULT_JOB_YAML};

pub fn run_init(args: InitArgs, level: LogLevel) -> Result<(), String> {
    if let Some(output_path) = &args.output {
        if output_path.exists() {
            return Err(format!("Refusing to overwrite existing file: {}", output_path.display()));
        }
        std::fs::write(output_path, DEFAULT_JOB_YAML).map_err(|e| format!("Failed to write file: {e}"))?;
        log(
            level,
            LogLevel::Normal,
            &format!("Job configuration saved to: {}", output_path.display()),
        );
    } else {
        println!("{DEFAULT_JOB_YAML}");
    }

    Ok(())
}
