//! Decoder layer math and width surgery
//!
//! RMSNorm, grouped-query causal attention with rotary embeddings, and a
//! SwiGLU MLP. Weights use the HF `[out_features, in_features]` layout.

use super::dims::GptDims;
use crate::prune::calibrate::LayerCapture;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayViewD, Axis};

/// Channels of one layer that survive width pruning, each ascending
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct KeptChannels {
    /// Query groups (key/value heads)
    pub query_groups: Vec<usize>,
    /// Attention heads, in global head numbering
    pub heads: Vec<usize>,
    /// FFN neurons
    pub ffn_neurons: Vec<usize>,
}

/// Weights of one decoder layer
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderLayer {
    pub input_layernorm: Array1<f32>,
    pub q_proj: Array2<f32>,
    pub k_proj: Array2<f32>,
    pub v_proj: Array2<f32>,
    pub o_proj: Array2<f32>,
    pub post_attention_layernorm: Array1<f32>,
    pub gate_proj: Array2<f32>,
    pub up_proj: Array2<f32>,
    pub down_proj: Array2<f32>,
}

/// Parameter suffixes in save order
pub(crate) const LAYER_PARAMS: [&str; 9] = [
    "input_layernorm.weight",
    "self_attn.q_proj.weight",
    "self_attn.k_proj.weight",
    "self_attn.v_proj.weight",
    "self_attn.o_proj.weight",
    "post_attention_layernorm.weight",
    "mlp.gate_proj.weight",
    "mlp.up_proj.weight",
    "mlp.down_proj.weight",
];

impl DecoderLayer {
    /// Expected shape of each parameter, aligned with [`LAYER_PARAMS`]
    pub(crate) fn expected_shapes(dims: &GptDims) -> [Vec<usize>; 9] {
        let h = dims.hidden_size;
        let f = dims.ffn_hidden_size;
        [
            vec![h],
            vec![dims.q_dim(), h],
            vec![dims.kv_dim(), h],
            vec![dims.kv_dim(), h],
            vec![h, dims.q_dim()],
            vec![h],
            vec![f, h],
            vec![f, h],
            vec![h, f],
        ]
    }

    /// Views of each parameter, aligned with [`LAYER_PARAMS`]
    pub(crate) fn params(&self) -> [ArrayViewD<'_, f32>; 9] {
        [
            self.input_layernorm.view().into_dyn(),
            self.q_proj.view().into_dyn(),
            self.k_proj.view().into_dyn(),
            self.v_proj.view().into_dyn(),
            self.o_proj.view().into_dyn(),
            self.post_attention_layernorm.view().into_dyn(),
            self.gate_proj.view().into_dyn(),
            self.up_proj.view().into_dyn(),
            self.down_proj.view().into_dyn(),
        ]
    }

    /// Run the layer over `x` `[seq, hidden]`
    ///
    /// With `capture`, records per-token head context norms and FFN
    /// activation magnitudes.
    pub(crate) fn forward(
        &self,
        x: &Array2<f32>,
        dims: &GptDims,
        rope: &Rope,
        mut capture: Option<&mut LayerCapture>,
    ) -> Array2<f32> {
        let kv = dims.kv_channels;
        let seq = x.nrows();

        let h = rms_norm(x, &self.input_layernorm, dims.layernorm_epsilon);
        let mut q = h.dot(&self.q_proj.t());
        let mut k = h.dot(&self.k_proj.t());
        let v = h.dot(&self.v_proj.t());
        rope.apply(&mut q, dims.num_attention_heads, kv);
        rope.apply(&mut k, dims.num_query_groups, kv);

        let scale = 1.0 / (kv as f32).sqrt();
        let heads_per_group = dims.heads_per_group();
        let mut context = Array2::<f32>::zeros((seq, dims.q_dim()));
        for head in 0..dims.num_attention_heads {
            let group = head / heads_per_group;
            let qh = q.slice(s![.., head * kv..(head + 1) * kv]);
            let kg = k.slice(s![.., group * kv..(group + 1) * kv]);
            let vg = v.slice(s![.., group * kv..(group + 1) * kv]);

            let mut scores = qh.dot(&kg.t());
            for (i, mut row) in scores.rows_mut().into_iter().enumerate() {
                row.mapv_inplace(|s| s * scale);
                for masked in row.iter_mut().skip(i + 1) {
                    *masked = f32::NEG_INFINITY;
                }
                softmax_in_place(row.as_slice_mut());
            }
            context.slice_mut(s![.., head * kv..(head + 1) * kv]).assign(&scores.dot(&vg));
        }

        if let Some(capture) = capture.as_deref_mut() {
            let mut norms = vec![0.0f32; dims.num_attention_heads];
            for row in context.rows() {
                for (head, norm) in norms.iter_mut().enumerate() {
                    let chunk = row.slice(s![head * kv..(head + 1) * kv]);
                    *norm = chunk.dot(&chunk).sqrt();
                }
                capture.heads.record(&norms);
            }
        }

        let x = x + &context.dot(&self.o_proj.t());

        let h = rms_norm(&x, &self.post_attention_layernorm, dims.layernorm_epsilon);
        let gate = h.dot(&self.gate_proj.t());
        let up = h.dot(&self.up_proj.t());
        let act = gate.mapv(silu) * &up;

        if let Some(capture) = capture {
            for row in act.rows() {
                match row.as_slice() {
                    Some(values) => capture.ffn.record(values),
                    None => capture.ffn.record(&row.to_vec()),
                }
            }
        }

        x + &act.dot(&self.down_proj.t())
    }

    /// Keep only the given heads, query groups and FFN neurons
    ///
    /// Rows of q/k/v/gate/up and columns of o/down are sliced; hidden size
    /// and head dimension are unchanged.
    pub(crate) fn retain(&mut self, kv_channels: usize, kept: &KeptChannels) {
        let head_rows = expand(&kept.heads, kv_channels);
        let group_rows = expand(&kept.query_groups, kv_channels);

        self.q_proj = self.q_proj.select(Axis(0), &head_rows);
        self.k_proj = self.k_proj.select(Axis(0), &group_rows);
        self.v_proj = self.v_proj.select(Axis(0), &group_rows);
        self.o_proj = self.o_proj.select(Axis(1), &head_rows).as_standard_layout().into_owned();
        self.gate_proj = self.gate_proj.select(Axis(0), &kept.ffn_neurons);
        self.up_proj = self.up_proj.select(Axis(0), &kept.ffn_neurons);
        self.down_proj = self.down_proj.select(Axis(1), &kept.ffn_neurons).as_standard_layout().into_owned();
    }
}

fn expand(blocks: &[usize], width: usize) -> Vec<usize> {
    blocks.iter().flat_map(|&b| b * width..(b + 1) * width).collect()
}

pub(crate) fn rms_norm(x: &Array2<f32>, weight: &Array1<f32>, eps: f32) -> Array2<f32> {
    let mut out = x.clone();
    for mut row in out.rows_mut() {
        let mean_sq = row.dot(&row) / row.len() as f32;
        let inv = 1.0 / (mean_sq + eps).sqrt();
        row.zip_mut_with(weight, |v, &w| *v *= inv * w);
    }
    out
}

fn silu(x: f32) -> f32 {
    x / (1.0 + (-x).exp())
}

fn softmax_in_place(row: Option<&mut [f32]>) {
    let Some(row) = row else { return };
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in row.iter_mut() {
        *v /= sum;
    }
}

/// Index of the largest logit, lowest index on ties
pub(crate) fn argmax(logits: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (i, &v) in logits.iter().enumerate() {
        if v > logits[best] {
            best = i;
        }
    }
    best
}

/// Rotary position tables for one sequence length
pub(crate) struct Rope {
    cos: Array2<f32>,
    sin: Array2<f32>,
}

impl Rope {
    pub(crate) fn new(seq_len: usize, head_dim: usize, base: f32) -> Self {
        let half = head_dim / 2;
        let mut cos = Array2::zeros((seq_len, half));
        let mut sin = Array2::zeros((seq_len, half));
        for pos in 0..seq_len {
            for i in 0..half {
                let inv_freq = base.powf(-((2 * i) as f32) / head_dim as f32);
                let angle = pos as f32 * inv_freq;
                cos[[pos, i]] = angle.cos();
                sin[[pos, i]] = angle.sin();
            }
        }
        Self { cos, sin }
    }

    /// Rotate each `head_dim` block of `x` `[seq, heads * head_dim]` (half-split pairs)
    pub(crate) fn apply(&self, x: &mut Array2<f32>, num_heads: usize, head_dim: usize) {
        let half = head_dim / 2;
        for (pos, mut row) in x.rows_mut().into_iter().enumerate() {
            for head in 0..num_heads {
                let base = head * head_dim;
                for i in 0..half {
                    let (c, s) = (self.cos[[pos, i]], self.sin[[pos, i]]);
                    let a = row[base + i];
                    let b = row[base + i + half];
                    row[base + i] = a * c - b * s;
                    row[base + i + half] = b * c + a * s;
                }
            }
        }
    }
}
