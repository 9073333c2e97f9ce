//! # podar
//!
//! Calibration-driven structured pruning for GPT-style checkpoints.
//!
//! A job restores a checkpoint, runs a calibration dataset through it in
//! inference mode, prunes FFN neurons, attention heads and query groups by
//! activation importance (Minitron width pruning), corrects the stored
//! config to the new width and saves the result.
//!
//! ## Modules
//!
//! - [`config`]: YAML job spec, dotted overrides, validation and CLI args
//! - [`model`]: reference decoder, checkpoint directory IO
//! - [`prune`]: calibration data, forward loop, pruner and the job pipeline
//! - [`runtime`]: the worker pool a job runs in
//! - [`device`]: accelerator detection
//! - [`cli`]: command handlers behind the `podar` binary

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod prune;
pub mod runtime;

pub use cli::LogLevel;
pub use error::{Error, Result};
