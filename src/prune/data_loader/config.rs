//! Configuration for calibration data loading.

use crate::config::PruneJobSpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where calibration text comes from and how it is batched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationDataConfig {
    /// Named dataset or path to a local JSON file.
    dataset: String,
    /// Samples per batch.
    batch_size: usize,
    /// Requested number of calibration samples.
    calib_size: usize,
    /// Maximum characters kept per sample.
    max_sequence_length: usize,
    /// Cache directory for hub downloads.
    cache_dir: Option<PathBuf>,
}

impl Default for CalibrationDataConfig {
    fn default() -> Self {
        Self {
            dataset: "cnn_dailymail".to_string(),
            batch_size: 64,
            calib_size: 512,
            max_sequence_length: 512,
            cache_dir: None,
        }
    }
}

impl CalibrationDataConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Data settings of a pruning job
    pub fn from_job(spec: &PruneJobSpec) -> Self {
        let mut config = Self::new()
            .with_dataset(&spec.prune.calib_dataset)
            .with_batch_size(spec.inference.batch_size)
            .with_calib_size(spec.prune.num_calib_size)
            .with_max_sequence_length(spec.inference.max_context_length);
        config.cache_dir = spec.data.cache_dir.clone();
        config
    }

    /// Set the dataset name or path.
    pub fn with_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Set the batch size. Zero is rejected when the loader is built.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the requested number of samples.
    pub fn with_calib_size(mut self, calib_size: usize) -> Self {
        self.calib_size = calib_size;
        self
    }

    /// Set the per-sample character limit.
    pub fn with_max_sequence_length(mut self, len: usize) -> Self {
        self.max_sequence_length = len;
        self
    }

    /// Set the cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn calib_size(&self) -> usize {
        self.calib_size
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn cache_dir(&self) -> Option<&PathBuf> {
        self.cache_dir.as_ref()
    }

    /// Rows read from the head of the dataset: enough to fill one batch and
    /// to cover the requested size.
    pub fn read_limit(&self) -> usize {
        self.calib_size.max(self.batch_size)
    }
}
