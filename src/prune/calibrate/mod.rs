//! Calibration statistics for width pruning
//!
//! Collects the per-channel activation magnitudes that Minitron importance
//! scores are computed from: FFN neuron activations and attention head
//! context norms, averaged over every calibration token.

mod collector;
mod stats;


pub use collector::{CalibrationCollector, LayerCapture};
pub use stats::LayerActivationStats;
