//! Pruning metrics collection
//!
//! Tracks metrics collected during the pruning pipeline.

use super::stage::PruningStage;
use crate::model::KeptChannels;
use serde::{Deserialize, Serialize};

/// Metrics collected during pruning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruningMetrics {
    /// Parameters in the restored model.
    pub parameters_before: usize,
    /// Parameters in the pruned model.
    pub parameters_after: usize,
    /// Calibration batches run.
    pub calibration_batches: usize,
    /// Calibration samples seen by the importance estimate.
    pub calibration_samples: usize,
    /// Kept channels per layer.
    pub kept: Vec<KeptChannels>,
    /// Duration of each stage in seconds.
    pub stage_durations: Vec<(PruningStage, f64)>,
}

impl PruningMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record parameter counts around pruning.
    pub fn update_parameters(&mut self, before: usize, after: usize) {
        self.parameters_before = before;
        self.parameters_after = after;
    }

    /// Parameters removed by pruning.
    pub fn parameters_removed(&self) -> usize {
        self.parameters_before.saturating_sub(self.parameters_after)
    }

    /// Fraction of parameters kept (1.0 before anything is recorded).
    pub fn retained_fraction(&self) -> f64 {
        if self.parameters_before == 0 {
            return 1.0;
        }
        self.parameters_after as f64 / self.parameters_before as f64
    }

    /// Record stage duration.
    pub fn record_stage_duration(&mut self, stage: PruningStage, duration_secs: f64) {
        self.stage_durations.push((stage, duration_secs));
    }

    /// Seconds spent in `stage`, if it ran.
    pub fn stage_duration(&self, stage: PruningStage) -> Option<f64> {
        self.stage_durations.iter().find(|(s, _)| *s == stage).map(|(_, d)| *d)
    }

    /// Get total pipeline duration.
    pub fn total_duration_secs(&self) -> f64 {
        self.stage_durations.iter().map(|(_, d)| d).sum()
    }
}
