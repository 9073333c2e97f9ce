//! Core CLI types - Cli, Command, and argument structs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::types::OutputFormat;

/// Podar: calibration-driven structured pruning
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "podar")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Calibrate and width-prune GPT-style checkpoints (Minitron)")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Calibrate, prune and save a checkpoint
    Prune(PruneArgs),

    /// Validate a job configuration without running it
    Validate(ValidateArgs),

    /// Display the resolved job configuration
    Info(InfoArgs),

    /// Write the default job configuration
    Init(InitArgs),

    /// List the tensors and config of a checkpoint directory
    Inspect(InspectArgs),
}

/// Arguments for the prune command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct PruneArgs {
    /// Path to YAML job configuration
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Dotted overrides, e.g. `prune.ffn_hidden_size=2048`
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ValidateArgs {
    /// Path to YAML job configuration
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Dotted overrides
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Show detailed validation report
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to YAML job configuration
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Dotted overrides
    #[arg(value_name = "KEY=VALUE")]
    pub overrides: Vec<String>,

    /// Output format (text, json, yaml)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the init command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InitArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the inspect command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InspectArgs {
    /// Checkpoint directory
    #[arg(value_name = "CHECKPOINT")]
    pub checkpoint: PathBuf,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
