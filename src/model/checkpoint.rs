//! Checkpoint directory layout
//!
//! ```text
//! <dir>/model_config.yaml          hyperparameter mapping
//! <dir>/model_weights.safetensors  all tensors, HF LLaMA naming
//! <dir>/tokenizer.json             optional, copied through unchanged
//! ```

use super::config::ModelConfig;
use super::traits::ParamInfo;
use super::weights::{read_metadata, write_tensors, WeightDtype};
use crate::config::ExportSpec;
use crate::error::{Error, Result};
use safetensors::SafeTensors;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const CONFIG_FILE: &str = "model_config.yaml";
pub const WEIGHTS_FILE: &str = "model_weights.safetensors";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Read the stored model config of a checkpoint directory
pub fn load_config(dir: &Path) -> Result<ModelConfig> {
    let path = dir.join(CONFIG_FILE);
    let yaml = std::fs::read_to_string(&path)
        .map_err(|e| Error::checkpoint(&path, format!("Failed to read config: {e}")))?;
    ModelConfig::from_yaml(&yaml)
}

/// Write config, weights and tokenizer into `dir`, creating it if needed
pub(crate) fn write_checkpoint(
    dir: &Path,
    config: &ModelConfig,
    tensors: &[(String, Vec<usize>, &[f32])],
    dtype: WeightDtype,
    export: &ExportSpec,
    tokenizer: Option<&Path>,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| Error::checkpoint(dir, format!("Failed to create directory: {e}")))?;

    std::fs::write(dir.join(CONFIG_FILE), config.to_yaml()?)?;

    let mut metadata = HashMap::new();
    metadata.insert("format".to_string(), "pt".to_string());
    metadata.insert("decoder_type".to_string(), export.decoder_type.clone());
    metadata.insert(
        "inference_tensor_parallel".to_string(),
        export.inference_tensor_parallel.to_string(),
    );
    write_tensors(&dir.join(WEIGHTS_FILE), tensors, dtype, metadata)?;

    if let Some(source) = tokenizer {
        let target = dir.join(TOKENIZER_FILE);
        if source != target {
            std::fs::copy(source, &target)?;
        }
    }
    Ok(())
}

/// What `podar inspect` reports about a checkpoint
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckpointSummary {
    pub config: ModelConfig,
    pub tensors: Vec<ParamInfo>,
    pub metadata: BTreeMap<String, String>,
    pub has_tokenizer: bool,
}

impl CheckpointSummary {
    /// Total parameter count
    pub fn num_parameters(&self) -> usize {
        self.tensors.iter().map(ParamInfo::numel).sum()
    }
}

/// Summarize a checkpoint without materializing its weights as f32
pub fn inspect(dir: &Path) -> Result<CheckpointSummary> {
    let config = load_config(dir)?;
    let weights = dir.join(WEIGHTS_FILE);
    let data = std::fs::read(&weights)
        .map_err(|e| Error::checkpoint(&weights, format!("Failed to read weights: {e}")))?;
    let parsed = SafeTensors::deserialize(&data)
        .map_err(|e| Error::checkpoint(&weights, format!("Failed to parse SafeTensors: {e}")))?;

    let mut tensors: Vec<ParamInfo> = parsed
        .tensors()
        .into_iter()
        .map(|(name, view)| ParamInfo {
            name,
            dtype: format!("{:?}", view.dtype()),
            shape: view.shape().to_vec(),
        })
        .collect();
    tensors.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(CheckpointSummary {
        config,
        tensors,
        metadata: read_metadata(&weights)?,
        has_tokenizer: dir.join(TOKENIZER_FILE).is_file(),
    })
}
