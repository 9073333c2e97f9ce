//! Validation error types
//!
//! Defines all validation error variants for pruning job specifications.

/// Validation error type
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("model.restore_from_path must be set")]
    EmptyRestorePath,

    #[error("export.save_path must be set")]
    EmptySavePath,

    #[error("Invalid tensor_model_parallel_size: {0} (pruning requires 1)")]
    InvalidTensorParallel(usize),

    #[error("Invalid pipeline_model_parallel_size: {0} (must be > 0)")]
    InvalidPipelineParallel(usize),

    #[error("Invalid trainer.devices: {0} (must be > 0)")]
    InvalidDevices(usize),

    #[error("Invalid trainer.num_nodes: {0} (must be > 0)")]
    InvalidNumNodes(usize),

    #[error("World size {world} is not divisible by tensor x pipeline parallel size {model_parallel}")]
    WorldSizeMismatch { world: usize, model_parallel: usize },

    #[error("Invalid trainer.num_threads: {0} (must be > 0)")]
    InvalidNumThreads(usize),

    #[error("prune.calib_dataset must be set")]
    EmptyCalibDataset,

    #[error("Invalid prune.num_calib_size: {0} (must be > 0)")]
    InvalidCalibSize(usize),

    #[error("Invalid inference.batch_size: {0} (must be > 0)")]
    InvalidBatchSize(usize),

    #[error("Invalid inference.max_context_length: {0} (must be > 0)")]
    InvalidMaxContextLength(usize),

    #[error("Invalid prune.{field}: {value} (must be > 0)")]
    InvalidTarget { field: &'static str, value: usize },

    #[error("prune.num_attention_heads ({heads}) must be divisible by prune.num_query_groups ({groups})")]
    HeadsNotDivisible { heads: usize, groups: usize },

    #[error("Invalid export.inference_tensor_parallel: {0} (must be > 0)")]
    InvalidInferenceParallel(usize),

    #[error("Invalid export.decoder_type: {0} (must be one of: llama, gptnext, gpt2, mistral, qwen)")]
    InvalidDecoderType(String),
}
