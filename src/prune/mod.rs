//! Calibration-driven structured pruning
//!
//! - **Calibration data**: fixed-size text batches from a hub dataset or a
//!   local JSON file
//! - **Forward loop**: runs every batch through a frozen model
//! - **Minitron**: activation-importance width pruning
//! - **Correction**: writes the pruned width back onto the model config
//! - **Pipeline**: the single-job orchestration around all of the above
//!
//! # Example
//!
//! ```ignore
//! use podar::cli::LogLevel;
//! use podar::config::load_spec;
//! use podar::prune::run_prune_job;
//!
//! let spec = load_spec("conf/prune.yaml", &["prune.ffn_hidden_size=9216".into()])?;
//! let outcome = run_prune_job(&spec, LogLevel::Normal)?;
//! println!("saved to {}", outcome.save_path.display());
//! ```
//!
//! # References
//!
//! - Muralidharan, S., et al. (2024). Compact Language Models via Pruning and
//!   Knowledge Distillation. arXiv:2407.14679.

pub mod calibrate;
pub mod correction;
pub mod data_loader;
pub mod forward_loop;
pub mod minitron;
mod pipeline;

pub use calibrate::{CalibrationCollector, LayerActivationStats, LayerCapture};
pub use correction::PostPruneCorrection;
pub use data_loader::{get_calib_dataloader, CalibrationDataConfig, CalibrationDataLoader};
pub use forward_loop::{CalibrationLoop, ForwardLoop};
pub use minitron::{prune, ExportConstraints, MinitronPruner, PruneMode, PruneReport, StructuredPruner};
pub use pipeline::{run_prune_job, PruneOutcome, PrunePipeline, PruningMetrics, PruningStage};
