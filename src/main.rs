//! Podar CLI
//!
//! # Usage
//!
//! ```bash
//! # Prune a checkpoint
//! podar prune conf/prune.yaml model.restore_from_path=llama3-8b-base
//!
//! # Narrower target from the command line
//! podar prune conf/prune.yaml prune.ffn_hidden_size=8192 export.save_path=out
//!
//! # Validate config
//! podar validate conf/prune.yaml --detailed
//!
//! # Inspect the result
//! podar inspect out
//! ```

use clap::Parser;
use podar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
