//! Model-side seams used by the calibration loop and the pruner

use super::config::ModelConfig;
use super::dims::GptDims;
use super::layer::KeptChannels;
use crate::config::InferenceSettings;
use crate::error::Result;
use crate::prune::calibrate::CalibrationCollector;
use std::fmt;

/// One entry of a model's state dict summary
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParamInfo {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

impl ParamInfo {
    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }
}

impl fmt::Display for ParamInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} {:?}", self.name, self.dtype, self.shape)
    }
}

/// A model that can run calibration batches in inference mode
pub trait CalibratableModel {
    /// Install the settings used by subsequent `predict_step` calls
    fn set_inference_config(&mut self, settings: &InferenceSettings);

    /// Run one batch of prompts; returns the generated token ids per prompt
    fn predict_step(&mut self, batch: &[String], batch_idx: usize) -> Result<Vec<Vec<u32>>>;

    /// Name, dtype and shape of every parameter
    fn state_dict(&self) -> Vec<ParamInfo>;

    fn config(&self) -> &ModelConfig;

    fn config_mut(&mut self) -> &mut ModelConfig;
}

/// A model whose width can be cut by a structured pruner
pub trait PrunableModel: CalibratableModel {
    /// Dimensions of the weights currently held
    fn dims(&self) -> GptDims;

    /// Record activation statistics on every following forward pass
    fn start_capture(&mut self);

    /// Stop recording and return what was collected
    fn take_capture(&mut self) -> Option<CalibrationCollector>;

    /// Keep only the given channels in every layer
    fn retain_width(&mut self, kept: &[KeptChannels]) -> Result<()>;
}
