//! Reference GPT-style decoder, its config and checkpoint format
//!
//! The model restores from a checkpoint directory, runs calibration batches
//! in inference mode on the worker pool, has its width cut by the pruner and
//! is saved back in the same layout.

pub mod checkpoint;
mod config;
mod dims;
mod gpt;
mod layer;
mod tokenizer;
mod traits;
mod weights;

#[cfg(test)]
pub(crate) mod tests;

pub use checkpoint::{inspect, load_config, CheckpointSummary};
pub use config::{merge_config, ModelConfig, BACKEND_NAME};
pub use dims::{default_kv_channels, GptDims};
pub use gpt::GptModel;
pub use layer::KeptChannels;
pub use tokenizer::CalibrationTokenizer;
pub use traits::{CalibratableModel, ParamInfo, PrunableModel};
pub use weights::{expected_weight_count, layer_weight_name, load_tensors, read_metadata, write_tensors, LoadedTensor, WeightDtype};
