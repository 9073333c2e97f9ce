//! Reference LLaMA-style decoder
//!
//! Restored from a checkpoint directory, run in inference mode over
//! calibration batches, width-pruned in place and saved back.

use super::checkpoint::{self, TOKENIZER_FILE, WEIGHTS_FILE};
use super::config::ModelConfig;
use super::dims::GptDims;
use super::layer::{argmax, rms_norm, DecoderLayer, KeptChannels, Rope, LAYER_PARAMS};
use super::tokenizer::CalibrationTokenizer;
use super::traits::{CalibratableModel, ParamInfo, PrunableModel};
use super::weights::{expected_weight_count, layer_weight_name, load_tensors, LoadedTensor, WeightDtype};
use crate::config::{ExportSpec, InferenceSettings, TrainerSpec};
use crate::error::{Error, Result};
use crate::prune::calibrate::{CalibrationCollector, LayerCapture};
use ndarray::{Array1, Array2, ArrayViewD};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const EMBED: &str = "model.embed_tokens.weight";
const FINAL_NORM: &str = "model.norm.weight";
const LM_HEAD: &str = "lm_head.weight";

/// Output of one prompt: generated ids plus activations of every forward pass
#[derive(Default)]
struct PromptOutput {
    generated: Vec<u32>,
    captures: Vec<Vec<LayerCapture>>,
}

/// GPT-style decoder with HF LLaMA weight naming
#[derive(Debug)]
pub struct GptModel {
    config: ModelConfig,
    dims: GptDims,
    embed_tokens: Array2<f32>,
    layers: Vec<DecoderLayer>,
    norm: Array1<f32>,
    lm_head: Option<Array2<f32>>,
    tokenizer: CalibrationTokenizer,
    tokenizer_source: Option<PathBuf>,
    dtype: WeightDtype,
    frozen: bool,
    inference: Option<InferenceSettings>,
    collector: Option<CalibrationCollector>,
}

impl GptModel {
    /// Restore from a checkpoint directory using an already merged config
    ///
    /// Weight shapes are checked against the dimensions the merged config
    /// describes. The in-memory dtype is f32; `trainer.precision` picks the
    /// dtype weights are saved in.
    pub fn restore_from(dir: &Path, config: &ModelConfig, trainer: &TrainerSpec) -> Result<Self> {
        let weights_path = dir.join(WEIGHTS_FILE);
        if !weights_path.is_file() {
            return Err(Error::checkpoint(dir, format!("missing {WEIGHTS_FILE}")));
        }
        let tensors = load_tensors(&weights_path)?;
        let mut model = Self::from_tensors(config.clone(), tensors, trainer.precision.into())?;

        let tokenizer_path = dir.join(TOKENIZER_FILE);
        if tokenizer_path.is_file() {
            model.tokenizer = CalibrationTokenizer::from_file(&tokenizer_path)?;
            model.tokenizer_source = Some(tokenizer_path);
        }
        Ok(model)
    }

    /// Build from loaded tensors, checking every shape against `config`
    pub fn from_tensors(
        config: ModelConfig,
        mut tensors: BTreeMap<String, LoadedTensor>,
        dtype: WeightDtype,
    ) -> Result<Self> {
        let dims = GptDims::from_config(&config)?;

        let embed = tensors
            .remove(EMBED)
            .ok_or_else(|| Error::Checkpoint {
                path: PathBuf::from(WEIGHTS_FILE),
                message: format!("missing {EMBED}"),
            })?;
        let vocab_size = embed.shape.first().copied().unwrap_or(0);
        if let Some(declared) = config.usize_field("vocab_size")? {
            if declared != vocab_size {
                return Err(Error::ShapeMismatch {
                    tensor: EMBED.to_string(),
                    expected: vec![declared, dims.hidden_size],
                    actual: embed.shape.clone(),
                });
            }
        }
        let embed_tokens = into_matrix(EMBED, embed, [vocab_size, dims.hidden_size])?;

        let mut layers = Vec::with_capacity(dims.num_layers);
        for index in 0..dims.num_layers {
            layers.push(take_layer(&mut tensors, index, &dims)?);
        }

        let norm = into_vector(FINAL_NORM, take(&mut tensors, FINAL_NORM)?, dims.hidden_size)?;
        let lm_head = match tensors.remove(LM_HEAD) {
            Some(t) => Some(into_matrix(LM_HEAD, t, [vocab_size, dims.hidden_size])?),
            None => None,
        };

        // rotary tables are recomputed, anything else would be lost on save
        tensors.retain(|name, _| !name.ends_with("rotary_emb.inv_freq"));
        if let Some(name) = tensors.keys().next() {
            return Err(Error::Checkpoint {
                path: PathBuf::from(WEIGHTS_FILE),
                message: format!("unexpected tensor {name} ({} extra)", tensors.len()),
            });
        }

        Ok(Self {
            config,
            dims,
            embed_tokens,
            layers,
            norm,
            lm_head,
            tokenizer: CalibrationTokenizer::bytes(vocab_size),
            tokenizer_source: None,
            dtype,
            frozen: false,
            inference: None,
            collector: None,
        })
    }

    /// Randomly initialized model for the dimensions in `config`
    pub fn random(config: ModelConfig, vocab_size: usize, seed: u64, dtype: WeightDtype) -> Result<Self> {
        let dims = GptDims::from_config(&config)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut matrix = |rows: usize, cols: usize| {
            let scale = 1.0 / (cols as f32).sqrt();
            Array2::from_shape_fn((rows, cols), |_| rng.random_range(-scale..scale))
        };

        let h = dims.hidden_size;
        let embed_tokens = matrix(vocab_size, h);
        let layers = (0..dims.num_layers)
            .map(|_| DecoderLayer {
                input_layernorm: Array1::ones(h),
                q_proj: matrix(dims.q_dim(), h),
                k_proj: matrix(dims.kv_dim(), h),
                v_proj: matrix(dims.kv_dim(), h),
                o_proj: matrix(h, dims.q_dim()),
                post_attention_layernorm: Array1::ones(h),
                gate_proj: matrix(dims.ffn_hidden_size, h),
                up_proj: matrix(dims.ffn_hidden_size, h),
                down_proj: matrix(h, dims.ffn_hidden_size),
            })
            .collect();
        let lm_head = (!dims.share_embeddings).then(|| matrix(vocab_size, h));

        Ok(Self {
            config,
            dims,
            embed_tokens,
            layers,
            norm: Array1::ones(h),
            lm_head,
            tokenizer: CalibrationTokenizer::bytes(vocab_size),
            tokenizer_source: None,
            dtype,
            frozen: false,
            inference: None,
            collector: None,
        })
    }

    /// Switch to inference-only mode
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Dimensions of the weights currently held
    pub fn dims(&self) -> &GptDims {
        &self.dims
    }

    pub fn vocab_size(&self) -> usize {
        self.embed_tokens.nrows()
    }

    pub fn dtype(&self) -> WeightDtype {
        self.dtype
    }

    pub fn tokenizer(&self) -> &CalibrationTokenizer {
        &self.tokenizer
    }

    /// Total parameter count
    pub fn num_parameters(&self) -> usize {
        self.named_parameters().iter().map(|(_, p)| p.len()).sum()
    }

    /// Start recording activation statistics on every forward pass
    pub fn start_capture(&mut self) {
        self.collector = Some(CalibrationCollector::new(&self.dims));
    }

    /// Stop recording and hand back what was collected
    pub fn take_capture(&mut self) -> Option<CalibrationCollector> {
        self.collector.take()
    }

    fn named_parameters(&self) -> Vec<(String, ArrayViewD<'_, f32>)> {
        let mut params = Vec::with_capacity(expected_weight_count(self.layers.len(), self.lm_head.is_some()));
        params.push((EMBED.to_string(), self.embed_tokens.view().into_dyn()));
        for (index, layer) in self.layers.iter().enumerate() {
            for (suffix, view) in LAYER_PARAMS.iter().zip(layer.params()) {
                params.push((layer_weight_name(index, suffix), view));
            }
        }
        params.push((FINAL_NORM.to_string(), self.norm.view().into_dyn()));
        if let Some(head) = &self.lm_head {
            params.push((LM_HEAD.to_string(), head.view().into_dyn()));
        }
        params
    }

    /// Logits of the last position, plus per-layer activations when capturing
    pub fn forward(&self, ids: &[u32], capture: bool) -> Result<(Array1<f32>, Option<Vec<LayerCapture>>)> {
        let Some(&last) = ids.last() else {
            return Err(Error::Runtime("forward called with an empty sequence".into()));
        };
        let vocab = self.vocab_size();
        if let Some(&bad) = ids.iter().find(|&&id| id as usize >= vocab) {
            return Err(Error::Tokenizer(format!("token id {bad} outside vocabulary of {vocab}")));
        }
        debug_assert!((last as usize) < vocab);

        let seq = ids.len();
        let mut x = Array2::<f32>::zeros((seq, self.dims.hidden_size));
        for (mut row, &id) in x.rows_mut().into_iter().zip(ids) {
            row.assign(&self.embed_tokens.row(id as usize));
        }

        let rope = Rope::new(seq, self.dims.kv_channels, self.dims.rotary_base);
        let mut captures = capture.then(|| Vec::with_capacity(self.layers.len()));
        for layer in &self.layers {
            let mut layer_capture = captures
                .as_ref()
                .map(|_| LayerCapture::new(self.dims.ffn_hidden_size, self.dims.num_attention_heads));
            x = layer.forward(&x, &self.dims, &rope, layer_capture.as_mut());
            if let (Some(all), Some(one)) = (captures.as_mut(), layer_capture) {
                all.push(one);
            }
        }

        let x = rms_norm(&x, &self.norm, self.dims.layernorm_epsilon);
        let head = self.lm_head.as_ref().unwrap_or(&self.embed_tokens);
        let logits = head.dot(&x.row(seq - 1));
        Ok((logits, captures))
    }

    fn run_prompt(&self, text: &str, settings: &InferenceSettings, capture: bool) -> Result<PromptOutput> {
        let mut ids = Vec::new();
        if settings.add_bos {
            ids.extend(self.tokenizer.bos_id());
        }
        ids.extend(self.tokenizer.encode(text)?);
        ids.truncate(settings.max_context_length);

        let mut output = PromptOutput::default();
        if ids.is_empty() {
            return Ok(output);
        }

        for step in 0..=settings.tokens_to_generate {
            let (logits, layer_captures) = self.forward(&ids, capture)?;
            output.captures.extend(layer_captures);
            if step == settings.tokens_to_generate {
                break;
            }
            let next = argmax(logits.view()) as u32;
            output.generated.push(next);
            ids.push(next);
        }
        Ok(output)
    }

    /// Slice every layer down to the kept channels and adopt the new width
    ///
    /// Only the weights and [`GptModel::dims`] change; the stored config is
    /// left for the caller to correct.
    pub fn retain_width(&mut self, kept: &[KeptChannels]) -> Result<()> {
        if kept.len() != self.layers.len() {
            return Err(Error::Prune(format!(
                "selection covers {} layers, model has {}",
                kept.len(),
                self.layers.len()
            )));
        }
        let Some(first) = kept.first() else {
            return Ok(());
        };
        let (groups, heads, ffn) =
            (first.query_groups.len(), first.heads.len(), first.ffn_neurons.len());
        if kept.iter().any(|k| {
            k.query_groups.len() != groups || k.heads.len() != heads || k.ffn_neurons.len() != ffn
        }) {
            return Err(Error::Prune("every layer must keep the same width".into()));
        }

        for (layer, channels) in self.layers.iter_mut().zip(kept) {
            layer.retain(self.dims.kv_channels, channels);
        }
        self.dims = self.dims.with_width(ffn, heads, groups);
        Ok(())
    }

    /// Fail unless the stored config describes exactly the weights held
    pub fn check_config_matches_weights(&self) -> Result<()> {
        let described = GptDims::from_config(&self.config)?;
        let expected = DecoderLayer::expected_shapes(&described);
        for (index, layer) in self.layers.iter().enumerate() {
            for ((suffix, view), shape) in LAYER_PARAMS.iter().zip(layer.params()).zip(&expected) {
                if view.shape() != shape.as_slice() {
                    return Err(Error::ShapeMismatch {
                        tensor: layer_weight_name(index, suffix),
                        expected: shape.clone(),
                        actual: view.shape().to_vec(),
                    });
                }
            }
        }
        if described.num_layers != self.layers.len() {
            return Err(Error::invalid_config(
                "num_layers",
                format!("config says {}, weights have {}", described.num_layers, self.layers.len()),
            ));
        }
        Ok(())
    }

    /// Write the checkpoint directory
    ///
    /// The config is checked against the weight shapes first, so a config
    /// that was not corrected after pruning is never written.
    pub fn save_to(&self, dir: &Path, export: &ExportSpec) -> Result<()> {
        self.check_config_matches_weights()?;

        let params = self.named_parameters();
        let mut tensors = Vec::with_capacity(params.len());
        for (name, view) in &params {
            let values = view.as_slice().ok_or_else(|| {
                Error::Serialization(format!("tensor {name} is not contiguous"))
            })?;
            tensors.push((name.clone(), view.shape().to_vec(), values));
        }

        checkpoint::write_checkpoint(
            dir,
            &self.config,
            &tensors,
            self.dtype,
            export,
            self.tokenizer_source.as_deref(),
        )
    }
}

fn take(tensors: &mut BTreeMap<String, LoadedTensor>, name: &str) -> Result<LoadedTensor> {
    tensors.remove(name).ok_or_else(|| Error::Checkpoint {
        path: PathBuf::from(WEIGHTS_FILE),
        message: format!("missing {name}"),
    })
}

fn into_matrix(name: &str, tensor: LoadedTensor, shape: [usize; 2]) -> Result<Array2<f32>> {
    if tensor.shape != shape {
        return Err(Error::ShapeMismatch {
            tensor: name.to_string(),
            expected: shape.to_vec(),
            actual: tensor.shape,
        });
    }
    Array2::from_shape_vec((shape[0], shape[1]), tensor.values)
        .map_err(|e| Error::Serialization(format!("tensor {name}: {e}")))
}

fn into_vector(name: &str, tensor: LoadedTensor, len: usize) -> Result<Array1<f32>> {
    if tensor.shape != [len] {
        return Err(Error::ShapeMismatch {
            tensor: name.to_string(),
            expected: vec![len],
            actual: tensor.shape,
        });
    }
    Ok(Array1::from_vec(tensor.values))
}

fn take_layer(
    tensors: &mut BTreeMap<String, LoadedTensor>,
    index: usize,
    dims: &GptDims,
) -> Result<DecoderLayer> {
    let shapes = DecoderLayer::expected_shapes(dims);
    let mut matrix = |slot: usize| -> Result<Array2<f32>> {
        let name = layer_weight_name(index, LAYER_PARAMS[slot]);
        let tensor = take(tensors, &name)?;
        into_matrix(&name, tensor, [shapes[slot][0], shapes[slot][1]])
    };
    let q_proj = matrix(1)?;
    let k_proj = matrix(2)?;
    let v_proj = matrix(3)?;
    let o_proj = matrix(4)?;
    let gate_proj = matrix(6)?;
    let up_proj = matrix(7)?;
    let down_proj = matrix(8)?;

    let mut vector = |slot: usize| -> Result<Array1<f32>> {
        let name = layer_weight_name(index, LAYER_PARAMS[slot]);
        let tensor = take(tensors, &name)?;
        into_vector(&name, tensor, dims.hidden_size)
    };
    Ok(DecoderLayer {
        input_layernorm: vector(0)?,
        q_proj,
        k_proj,
        v_proj,
        o_proj,
        post_attention_layernorm: vector(5)?,
        gate_proj,
        up_proj,
        down_proj,
    })
}

impl CalibratableModel for GptModel {
    fn set_inference_config(&mut self, settings: &InferenceSettings) {
        self.inference = Some(settings.clone());
    }

    /// Runs the prompts of a batch in parallel on the current rayon pool.
    fn predict_step(&mut self, batch: &[String], batch_idx: usize) -> Result<Vec<Vec<u32>>> {
        if !self.is_frozen() {
            return Err(Error::Runtime("predict_step requires a frozen model; call freeze() first".into()));
        }
        let settings = self
            .inference
            .as_ref()
            .ok_or_else(|| Error::Runtime("inference config not set before predict_step".into()))?;
        let capture = self.collector.is_some();

        let outputs = batch
            .par_iter()
            .map(|text| self.run_prompt(text, settings, capture))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| match e {
                Error::Runtime(msg) => Error::Runtime(format!("batch {batch_idx}: {msg}")),
                other => other,
            })?;

        let mut generated = Vec::with_capacity(outputs.len());
        if let Some(collector) = self.collector.as_mut() {
            for output in &outputs {
                for captures in &output.captures {
                    collector.record_sequence(captures);
                }
            }
            collector.batch_complete(batch.len());
        }
        for output in outputs {
            generated.push(output.generated);
        }
        Ok(generated)
    }

    fn state_dict(&self) -> Vec<ParamInfo> {
        let dtype = self.dtype.name().to_string();
        self.named_parameters()
            .into_iter()
            .map(|(name, view)| ParamInfo { name, dtype: dtype.clone(), shape: view.shape().to_vec() })
            .collect()
    }

    fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn config_mut(&mut self) -> &mut ModelConfig {
        &mut self.config
    }
}

impl PrunableModel for GptModel {
    fn dims(&self) -> GptDims {
        self.dims
    }

    fn start_capture(&mut self) {
        GptModel::start_capture(self);
    }

    fn take_capture(&mut self) -> Option<CalibrationCollector> {
        GptModel::take_capture(self)
    }

    fn retain_width(&mut self, kept: &[KeptChannels]) -> Result<()> {
        GptModel::retain_width(self, kept)
    }
}
