//! Pruning pipeline stage enum
//!
//! Defines the stages a pruning job moves through.

use serde::{Deserialize, Serialize};

/// Current stage of the pruning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PruningStage {
    /// Not started.
    #[default]
    Idle,
    /// Merging the config and restoring the checkpoint.
    Restoring,
    /// Fetching and batching calibration data.
    Calibrating,
    /// Calibration forward passes, importance ranking and weight surgery.
    Pruning,
    /// Writing the corrected config onto the pruned model.
    Correcting,
    /// Saving the pruned checkpoint.
    Exporting,
    /// Pipeline complete.
    Complete,
    /// Pipeline failed.
    Failed,
}

impl PruningStage {
    /// Check if the pipeline is in an active (non-terminal) state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            PruningStage::Restoring
                | PruningStage::Calibrating
                | PruningStage::Pruning
                | PruningStage::Correcting
                | PruningStage::Exporting
        )
    }

    /// Check if the pipeline is complete (success or failure).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PruningStage::Complete | PruningStage::Failed)
    }

    /// Stage that follows this one on success.
    pub fn next(&self) -> PruningStage {
        match self {
            PruningStage::Idle => PruningStage::Restoring,
            PruningStage::Restoring => PruningStage::Calibrating,
            PruningStage::Calibrating => PruningStage::Pruning,
            PruningStage::Pruning => PruningStage::Correcting,
            PruningStage::Correcting => PruningStage::Exporting,
            PruningStage::Exporting => PruningStage::Complete,
            // Terminal states don't advance
            PruningStage::Complete | PruningStage::Failed => *self,
        }
    }

    /// Get display name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            PruningStage::Idle => "Idle",
            PruningStage::Restoring => "Restoring",
            PruningStage::Calibrating => "Calibrating",
            PruningStage::Pruning => "Pruning",
            PruningStage::Correcting => "Correcting Config",
            PruningStage::Exporting => "Exporting",
            PruningStage::Complete => "Complete",
            PruningStage::Failed => "Failed",
        }
    }
}
