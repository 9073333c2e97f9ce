//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! podar prune conf/prune.yaml model.restore_from_path=llama3-8b-base
//! podar validate conf/prune.yaml trainer.devices=8
//! podar info conf/prune.yaml --format json
//! podar init --output prune.yaml
//! podar inspect llama3-8b-base-pruned
//! ```

mod core;
mod types;


pub use core::{
    parse_args, Cli, Command, InfoArgs, InitArgs, InspectArgs, PruneArgs, ValidateArgs,
};
pub use types::OutputFormat;
