//! Calibration data loader implementation.

use super::config::CalibrationDataConfig;
use super::iter::CalibrationBatches;
use super::reader::read_texts;
use super::source::CalibrationSource;
use crate::error::{Error, Result};

/// Number of samples actually used: `max(min(available, requested), batch_size)`
///
/// Only meaningful for `available >= batch_size`; smaller datasets are
/// rejected before this is used.
pub fn effective_calib_size(available: usize, requested: usize, batch_size: usize) -> usize {
    available.min(requested).max(batch_size)
}

/// Calibration data loader for pruning.
///
/// Reads only the head of the dataset and hands out full batches.
#[derive(Debug, Clone)]
pub struct CalibrationDataLoader {
    config: CalibrationDataConfig,
    source: CalibrationSource,
}

impl CalibrationDataLoader {
    /// Create a loader; a zero batch size is rejected here.
    pub fn new(config: CalibrationDataConfig) -> Result<Self> {
        if config.batch_size() == 0 {
            return Err(Error::invalid_config("inference.batch_size", "must be > 0"));
        }
        let source = CalibrationSource::parse(config.dataset());
        Ok(Self { config, source })
    }

    pub fn config(&self) -> &CalibrationDataConfig {
        &self.config
    }

    pub fn source(&self) -> &CalibrationSource {
        &self.source
    }

    /// Fetch the head of the dataset and split it into batches.
    pub fn load(self) -> Result<CalibrationBatches> {
        let texts = read_texts(
            &self.source,
            self.config.read_limit(),
            self.config.cache_dir().map(|p| p.as_path()),
        )?;
        batches_from_texts(texts, &self.config)
    }
}

/// Split already-read texts into batches per `config`
pub fn batches_from_texts(
    mut texts: Vec<String>,
    config: &CalibrationDataConfig,
) -> Result<CalibrationBatches> {
    let batch_size = config.batch_size();
    if batch_size == 0 {
        return Err(Error::invalid_config("inference.batch_size", "must be > 0"));
    }
    let available = texts.len();
    if available < batch_size {
        return Err(Error::Dataset(format!(
            "dataset smaller than one batch: {available} samples for batch size {batch_size}"
        )));
    }

    let effective = effective_calib_size(available, config.calib_size(), batch_size);
    texts.truncate(effective / batch_size * batch_size);
    Ok(CalibrationBatches::new(texts, batch_size, config.max_sequence_length()))
}

/// Calibration batches for `dataset` with the default cache location
pub fn get_calib_dataloader(
    dataset: &str,
    batch_size: usize,
    calib_size: usize,
    max_sequence_length: usize,
) -> Result<CalibrationBatches> {
    let config = CalibrationDataConfig::new()
        .with_dataset(dataset)
        .with_batch_size(batch_size)
        .with_calib_size(calib_size)
        .with_max_sequence_length(max_sequence_length);
    CalibrationDataLoader::new(config)?.load()
}
