//! Per-channel activation statistics for calibration.

/// Running mean of an activation magnitude per channel.
///
/// A channel is an FFN neuron or an attention head. Every recorded row is one
/// token position, so the mean is taken over all calibration tokens.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerActivationStats {
    /// Running sum of |activation| per channel (f64 to keep long runs exact).
    abs_sum: Vec<f64>,
    /// Number of rows recorded.
    count: usize,
}

impl LayerActivationStats {
    /// Create a tracker for `dim` channels.
    pub fn new(dim: usize) -> Self {
        Self { abs_sum: vec![0.0; dim], count: 0 }
    }

    /// Record one row of magnitudes, one per channel.
    pub fn record(&mut self, row: &[f32]) {
        debug_assert_eq!(row.len(), self.abs_sum.len(), "activation width mismatch");
        for (sum, &value) in self.abs_sum.iter_mut().zip(row) {
            *sum += f64::from(value.abs());
        }
        self.count += 1;
    }

    /// Fold another tracker over the same channels into this one.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(other.abs_sum.len(), self.abs_sum.len(), "activation width mismatch");
        for (sum, value) in self.abs_sum.iter_mut().zip(&other.abs_sum) {
            *sum += value;
        }
        self.count += other.count;
    }

    /// Mean absolute value per channel (zeros before any row is recorded).
    pub fn mean_abs(&self) -> Vec<f32> {
        if self.count == 0 {
            return vec![0.0; self.abs_sum.len()];
        }
        let n = self.count as f64;
        self.abs_sum.iter().map(|&sum| (sum / n) as f32).collect()
    }

    /// Number of rows recorded.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Number of channels.
    pub fn dim(&self) -> usize {
        self.abs_sum.len()
    }

    /// Check if any statistics have been collected.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Reset all statistics.
    pub fn reset(&mut self) {
        self.abs_sum.fill(0.0);
        self.count = 0;
    }
}
