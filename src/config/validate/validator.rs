//! Job specification validation logic
//!
//! Runs before any expensive work so a bad override fails in milliseconds
//! rather than after the checkpoint has been restored.

use super::error::ValidationError;
use crate::config::schema::PruneJobSpec;

/// Decoder families the export tag may name
pub const DECODER_TYPES: [&str; 5] = ["llama", "gptnext", "gpt2", "mistral", "qwen"];

/// Validate a pruning job specification
///
/// Checks:
/// - Required paths are set
/// - Parallelism degrees are consistent (tensor parallel must be 1)
/// - Calibration and pruning targets are positive
/// - Target heads are divisible by target query groups
pub fn validate_spec(spec: &PruneJobSpec) -> Result<(), ValidationError> {
    if spec.model.restore_from_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyRestorePath);
    }
    if spec.export.save_path.as_os_str().is_empty() {
        return Err(ValidationError::EmptySavePath);
    }

    let tp = spec.model.tensor_model_parallel_size;
    if tp != 1 {
        return Err(ValidationError::InvalidTensorParallel(tp));
    }
    let pp = spec.model.pipeline_model_parallel_size;
    if pp == 0 {
        return Err(ValidationError::InvalidPipelineParallel(pp));
    }

    if spec.trainer.devices == 0 {
        return Err(ValidationError::InvalidDevices(spec.trainer.devices));
    }
    if spec.trainer.num_nodes == 0 {
        return Err(ValidationError::InvalidNumNodes(spec.trainer.num_nodes));
    }
    let world = spec.trainer.world_size();
    if world % (tp * pp) != 0 {
        return Err(ValidationError::WorldSizeMismatch { world, model_parallel: tp * pp });
    }
    if spec.trainer.num_threads == Some(0) {
        return Err(ValidationError::InvalidNumThreads(0));
    }

    if spec.prune.calib_dataset.trim().is_empty() {
        return Err(ValidationError::EmptyCalibDataset);
    }
    if spec.prune.num_calib_size == 0 {
        return Err(ValidationError::InvalidCalibSize(0));
    }
    if spec.inference.batch_size == 0 {
        return Err(ValidationError::InvalidBatchSize(0));
    }
    if spec.inference.max_context_length == 0 {
        return Err(ValidationError::InvalidMaxContextLength(0));
    }

    let targets = [
        ("ffn_hidden_size", spec.prune.ffn_hidden_size),
        ("num_attention_heads", spec.prune.num_attention_heads),
        ("num_query_groups", spec.prune.num_query_groups),
    ];
    for (field, value) in targets {
        if value == 0 {
            return Err(ValidationError::InvalidTarget { field, value });
        }
    }
    if spec.prune.num_attention_heads % spec.prune.num_query_groups != 0 {
        return Err(ValidationError::HeadsNotDivisible {
            heads: spec.prune.num_attention_heads,
            groups: spec.prune.num_query_groups,
        });
    }

    if spec.export.inference_tensor_parallel == 0 {
        return Err(ValidationError::InvalidInferenceParallel(0));
    }
    if !DECODER_TYPES.contains(&spec.export.decoder_type.as_str()) {
        return Err(ValidationError::InvalidDecoderType(spec.export.decoder_type.clone()));
    }

    Ok(())
}
