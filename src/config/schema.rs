//! YAML schema definitions for a pruning job
//!
//! A job is described by five groups: `model`, `trainer`, `prune`, `export`
//! and `inference`. Unknown keys inside `model`, `trainer` and `inference`
//! are kept so they can be passed through to the checkpoint config or the
//! model's inference settings untouched.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

fn default_one() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Complete pruning job specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneJobSpec {
    /// Checkpoint to restore plus config overrides
    pub model: ModelSpec,

    /// Execution resources
    #[serde(default)]
    pub trainer: TrainerSpec,

    /// Calibration data and pruning targets
    pub prune: PruneSpec,

    /// Output checkpoint
    pub export: ExportSpec,

    /// Settings for calibration forward passes
    #[serde(default)]
    pub inference: InferenceSettings,

    /// Calibration data download settings
    #[serde(default)]
    pub data: DataSpec,
}

/// `model.*` group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Checkpoint directory to restore
    pub restore_from_path: PathBuf,

    /// Tensor-parallel degree (must be 1)
    #[serde(default = "default_one")]
    pub tensor_model_parallel_size: usize,

    /// Pipeline-parallel degree
    #[serde(default = "default_one")]
    pub pipeline_model_parallel_size: usize,

    /// Any other key overlays the checkpoint's stored config
    #[serde(flatten)]
    pub overrides: BTreeMap<String, Value>,
}

impl ModelSpec {
    /// Render the whole group as a YAML mapping, including the typed keys
    pub fn to_mapping(&self) -> serde_yaml::Mapping {
        let mut mapping = serde_yaml::Mapping::new();
        mapping.insert(
            Value::from("restore_from_path"),
            Value::from(self.restore_from_path.display().to_string()),
        );
        mapping.insert(
            Value::from("tensor_model_parallel_size"),
            Value::from(self.tensor_model_parallel_size as u64),
        );
        mapping.insert(
            Value::from("pipeline_model_parallel_size"),
            Value::from(self.pipeline_model_parallel_size as u64),
        );
        for (key, value) in &self.overrides {
            mapping.insert(Value::from(key.as_str()), value.clone());
        }
        mapping
    }
}

/// Which accelerator the job requires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceleratorKind {
    /// CUDA device required
    #[default]
    Gpu,
    /// Reference CPU backend
    Cpu,
}

/// Numeric precision used when saving weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// bfloat16
    #[default]
    Bf16,
    /// IEEE half precision
    Fp16,
    /// IEEE single precision
    Fp32,
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bf16" | "bf16-mixed" | "bf16-true" => Ok(Self::Bf16),
            "16" | "16-mixed" | "16-true" | "fp16" => Ok(Self::Fp16),
            "32" | "32-true" | "fp32" => Ok(Self::Fp32),
            _ => Err(format!("Unknown precision: {s}. Valid values: bf16, 16, 32")),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bf16 => write!(f, "bf16"),
            Self::Fp16 => write!(f, "16"),
            Self::Fp32 => write!(f, "32"),
        }
    }
}

impl Serialize for Precision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Accept `precision: bf16`, `precision: "16"` and the bare integer `precision: 16`.
impl<'de> Deserialize<'de> for Precision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumOrString {
            Num(u64),
            Str(String),
        }

        let raw = match NumOrString::deserialize(deserializer)? {
            NumOrString::Num(n) => n.to_string(),
            NumOrString::Str(s) => s,
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `trainer.*` group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerSpec {
    /// Accelerators per node
    #[serde(default = "default_one")]
    pub devices: usize,

    /// Number of nodes
    #[serde(default = "default_one")]
    pub num_nodes: usize,

    /// Precision of saved weights
    #[serde(default)]
    pub precision: Precision,

    /// Required accelerator
    #[serde(default)]
    pub accelerator: AcceleratorKind,

    /// Worker threads for calibration compute (defaults to available cores)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,

    /// Other trainer keys (logger, max_steps, ...) accepted and ignored
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for TrainerSpec {
    fn default() -> Self {
        Self {
            devices: 1,
            num_nodes: 1,
            precision: Precision::default(),
            accelerator: AcceleratorKind::default(),
            num_threads: None,
            extra: BTreeMap::new(),
        }
    }
}

impl TrainerSpec {
    /// Number of participants in the job
    pub fn world_size(&self) -> usize {
        self.devices * self.num_nodes
    }
}

fn default_calib_dataset() -> String {
    "cnn_dailymail".to_string()
}

fn default_num_calib_size() -> usize {
    512
}

/// `prune.*` group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneSpec {
    /// Named dataset (`wikitext`, `cnn_dailymail`, `pile`) or JSON file path
    #[serde(default = "default_calib_dataset")]
    pub calib_dataset: String,

    /// Requested number of calibration samples
    #[serde(default = "default_num_calib_size")]
    pub num_calib_size: usize,

    /// Target feed-forward hidden size
    pub ffn_hidden_size: usize,

    /// Target attention head count
    pub num_attention_heads: usize,

    /// Target query-group count
    pub num_query_groups: usize,
}

fn default_decoder_type() -> String {
    "llama".to_string()
}

/// `export.*` group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSpec {
    /// Decoder family tag recorded in the saved checkpoint
    #[serde(default = "default_decoder_type")]
    pub decoder_type: String,

    /// Tensor-parallel degree the pruned model is meant to be served with
    #[serde(default = "default_one")]
    pub inference_tensor_parallel: usize,

    /// Output checkpoint directory
    pub save_path: PathBuf,
}

fn default_inference_batch_size() -> usize {
    64
}

fn default_max_context_length() -> usize {
    512
}

/// `inference.*` group
///
/// Only the typed fields are interpreted by the reference model. Everything
/// else (sampling knobs and so on) is carried opaquely in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSettings {
    /// Calibration batch size
    #[serde(default = "default_inference_batch_size")]
    pub batch_size: usize,

    /// Maximum characters per calibration sample and tokens per forward pass
    #[serde(default = "default_max_context_length")]
    pub max_context_length: usize,

    /// Prepend the tokenizer's BOS token
    #[serde(rename = "add_BOS", default)]
    pub add_bos: bool,

    /// Greedy tokens appended to each prompt during calibration
    #[serde(default)]
    pub tokens_to_generate: usize,

    /// Greedy decoding (the only decoding the reference model performs)
    #[serde(default = "default_true")]
    pub greedy: bool,

    /// Pass-through settings
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            batch_size: default_inference_batch_size(),
            max_context_length: default_max_context_length(),
            add_bos: false,
            tokens_to_generate: 0,
            greedy: true,
            extra: BTreeMap::new(),
        }
    }
}

/// `data.*` group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataSpec {
    /// Cache directory for hub downloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
}

/// Default job manifest written by `podar init`
pub const DEFAULT_JOB_YAML: &str = include_str!("../../conf/prune.yaml");
