//! SafeTensors weight IO
//!
//! Tensors are held as f32 in memory. On disk they may be F32, F16 or BF16;
//! the save dtype follows `trainer.precision`.

use crate::config::Precision;
use crate::error::{Error, Result};
use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// On-disk element type of saved weights
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightDtype {
    F32,
    F16,
    Bf16,
}

impl WeightDtype {
    /// SafeTensors dtype tag
    pub fn safetensors_dtype(self) -> Dtype {
        match self {
            Self::F32 => Dtype::F32,
            Self::F16 => Dtype::F16,
            Self::Bf16 => Dtype::BF16,
        }
    }

    /// Short name used in parameter listings
    pub fn name(self) -> &'static str {
        match self {
            Self::F32 => "float32",
            Self::F16 => "float16",
            Self::Bf16 => "bfloat16",
        }
    }
}

impl From<Precision> for WeightDtype {
    fn from(precision: Precision) -> Self {
        match precision {
            Precision::Bf16 => Self::Bf16,
            Precision::Fp16 => Self::F16,
            Precision::Fp32 => Self::F32,
        }
    }
}

/// A tensor read from disk, widened to f32
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTensor {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
    pub dtype: Dtype,
}

/// Convert SafeTensors tensor view to f32 Vec
///
/// Handles bf16, fp16, and fp32 formats.
pub(crate) fn tensor_to_f32_vec(name: &str, tensor: &TensorView<'_>) -> Result<Vec<f32>> {
    let data = tensor.data();
    match tensor.dtype() {
        Dtype::F32 => Ok(data
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()),
        Dtype::F16 => Ok(data
            .chunks_exact(2)
            .map(|chunk| half::f16::from_bits(u16::from_le_bytes([chunk[0], chunk[1]])).to_f32())
            .collect()),
        Dtype::BF16 => Ok(data
            .chunks_exact(2)
            .map(|chunk| half::bf16::from_bits(u16::from_le_bytes([chunk[0], chunk[1]])).to_f32())
            .collect()),
        other => Err(Error::Serialization(format!(
            "Unsupported dtype {other:?} for tensor {name} (expected F32, F16 or BF16)"
        ))),
    }
}

/// Narrow f32 values to the on-disk dtype, little endian
pub(crate) fn encode_values(values: &[f32], dtype: WeightDtype) -> Vec<u8> {
    match dtype {
        WeightDtype::F32 => bytemuck::cast_slice(values).to_vec(),
        WeightDtype::F16 => values
            .iter()
            .flat_map(|&v| half::f16::from_f32(v).to_bits().to_le_bytes())
            .collect(),
        WeightDtype::Bf16 => values
            .iter()
            .flat_map(|&v| half::bf16::from_f32(v).to_bits().to_le_bytes())
            .collect(),
    }
}

/// Read every tensor of a SafeTensors file
pub fn load_tensors(path: &Path) -> Result<BTreeMap<String, LoadedTensor>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::checkpoint(path, format!("Failed to read weights: {e}")))?;
    let tensors = SafeTensors::deserialize(&data)
        .map_err(|e| Error::checkpoint(path, format!("Failed to parse SafeTensors: {e}")))?;

    let mut loaded = BTreeMap::new();
    for (name, view) in tensors.tensors() {
        let values = tensor_to_f32_vec(&name, &view)?;
        loaded.insert(
            name,
            LoadedTensor { shape: view.shape().to_vec(), values, dtype: view.dtype() },
        );
    }
    Ok(loaded)
}

/// Read only the header metadata of a SafeTensors file
pub fn read_metadata(path: &Path) -> Result<BTreeMap<String, String>> {
    let data = std::fs::read(path)
        .map_err(|e| Error::checkpoint(path, format!("Failed to read weights: {e}")))?;
    let (_, metadata) = SafeTensors::read_metadata(&data)
        .map_err(|e| Error::checkpoint(path, format!("Failed to parse SafeTensors header: {e}")))?;
    Ok(metadata
        .metadata()
        .as_ref()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default())
}

/// Write tensors to a SafeTensors file in the given dtype
///
/// `tensors` are `(name, shape, values)`.
pub fn write_tensors(
    path: &Path,
    tensors: &[(String, Vec<usize>, &[f32])],
    dtype: WeightDtype,
    metadata: HashMap<String, String>,
) -> Result<()> {
    let tensor_data: Vec<(&str, Vec<u8>, &Vec<usize>)> = tensors
        .iter()
        .map(|(name, shape, values)| (name.as_str(), encode_values(values, dtype), shape))
        .collect();

    let mut views = Vec::with_capacity(tensor_data.len());
    for (name, bytes, shape) in &tensor_data {
        let view = TensorView::new(dtype.safetensors_dtype(), (*shape).clone(), bytes)
            .map_err(|e| Error::Serialization(format!("Invalid tensor {name}: {e}")))?;
        views.push((*name, view));
    }

    let bytes = safetensors::serialize(views, &Some(metadata))
        .map_err(|e| Error::Serialization(format!("SafeTensors serialization failed: {e}")))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Name of a per-layer tensor in HF LLaMA naming
pub fn layer_weight_name(layer: usize, suffix: &str) -> String {
    format!("model.layers.{layer}.{suffix}")
}

/// Get expected weight count for a decoder
pub fn expected_weight_count(num_layers: usize, has_lm_head: bool) -> usize {
    // 9 per layer: two norms, q/k/v/o, gate/up/down
    // plus embed_tokens and the final norm
    let base = 2 + num_layers * 9;
    if has_lm_head {
        base + 1
    } else {
        base
    }
}
