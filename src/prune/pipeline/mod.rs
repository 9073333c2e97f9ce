//! Prune job pipeline
//!
//! One job, in fixed order:
//! 1. Restore: merge the stored config with the job's overrides and load weights
//! 2. Calibrate: build the calibration batches
//! 3. Prune: forward passes, importance ranking, weight surgery
//! 4. Correct: write the pruned width onto the model config
//! 5. Export: save the checkpoint, then wait on every worker

mod metrics;
mod orchestrator;
mod stage;
#[cfg(test)]
mod tests;

pub use metrics::PruningMetrics;
pub use orchestrator::{run_prune_job, PruneOutcome, PrunePipeline};
pub use stage::PruningStage;
