//! Calibration data collector for width pruning.

use super::stats::LayerActivationStats;
use crate::model::GptDims;

/// Activation statistics of one decoder layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerCapture {
    /// |silu(gate) * up| per FFN neuron.
    pub ffn: LayerActivationStats,
    /// L2 norm of each head's attention context.
    pub heads: LayerActivationStats,
}

impl LayerCapture {
    /// Empty capture for `ffn` neurons and `heads` attention heads.
    pub fn new(ffn: usize, heads: usize) -> Self {
        Self { ffn: LayerActivationStats::new(ffn), heads: LayerActivationStats::new(heads) }
    }

    /// Fold another capture of the same layer into this one.
    pub fn merge(&mut self, other: &Self) {
        self.ffn.merge(&other.ffn);
        self.heads.merge(&other.heads);
    }
}

/// Calibration data collector for width pruning.
///
/// Forward passes produce one [`LayerCapture`] per layer per sequence; the
/// collector folds them in the order sequences appear in their batch so the
/// result does not depend on thread scheduling.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationCollector {
    /// Per-layer activation statistics.
    layers: Vec<LayerCapture>,
    /// Total samples processed.
    samples_processed: usize,
    /// Total batches processed.
    batches_processed: usize,
}

impl CalibrationCollector {
    /// Create a collector shaped for the given model dimensions.
    pub fn new(dims: &GptDims) -> Self {
        Self {
            layers: (0..dims.num_layers)
                .map(|_| LayerCapture::new(dims.ffn_hidden_size, dims.num_attention_heads))
                .collect(),
            samples_processed: 0,
            batches_processed: 0,
        }
    }

    /// Fold the per-layer captures of one forward pass.
    pub fn record_sequence(&mut self, captures: &[LayerCapture]) {
        for (layer, capture) in self.layers.iter_mut().zip(captures) {
            layer.merge(capture);
        }
    }

    /// Mark a batch as processed.
    pub fn batch_complete(&mut self, batch_size: usize) {
        self.samples_processed += batch_size;
        self.batches_processed += 1;
    }

    /// Statistics of layer `index`.
    pub fn layer(&self, index: usize) -> Option<&LayerCapture> {
        self.layers.get(index)
    }

    /// Number of layers tracked.
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Get the number of samples processed.
    pub fn samples_processed(&self) -> usize {
        self.samples_processed
    }

    /// Get the number of batches processed.
    pub fn batches_processed(&self) -> usize {
        self.batches_processed
    }

    /// True until at least one token has been recorded.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.ffn.is_empty())
    }

    /// Reset all collected statistics.
    pub fn reset(&mut self) {
        for layer in &mut self.layers {
            layer.ffn.reset();
            layer.heads.reset();
        }
        self.samples_processed = 0;
        self.batches_processed = 0;
    }
}
