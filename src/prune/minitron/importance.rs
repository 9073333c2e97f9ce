//! Channel importance and selection
//!
//! FFN neurons are scored by their mean |activation|, heads by the mean L2
//! norm of their attention context, and query groups by the summed score of
//! their heads.

use super::constraints::ExportConstraints;
use crate::model::{GptDims, KeptChannels};
use crate::prune::calibrate::LayerCapture;

/// Indices of the `k` largest scores, returned ascending
///
/// Equal scores rank the lower index first.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(k);
    order.sort_unstable();
    order
}

/// Summed head score of every query group
pub fn group_scores(head_scores: &[f32], heads_per_group: usize) -> Vec<f32> {
    head_scores.chunks(heads_per_group.max(1)).map(|chunk| chunk.iter().sum()).collect()
}

/// Channels of one layer to keep
pub fn select_layer(
    capture: &LayerCapture,
    dims: &GptDims,
    constraints: &ExportConstraints,
) -> KeptChannels {
    let head_scores = capture.heads.mean_abs();
    let hpg = dims.heads_per_group();
    let query_groups = top_k(&group_scores(&head_scores, hpg), constraints.num_query_groups);

    let keep_per_group = constraints.heads_per_group();
    let mut heads = Vec::with_capacity(constraints.num_attention_heads);
    for &group in &query_groups {
        let first = group * hpg;
        let local = top_k(&head_scores[first..first + hpg], keep_per_group);
        heads.extend(local.into_iter().map(|head| first + head));
    }

    let ffn_neurons = top_k(&capture.ffn.mean_abs(), constraints.ffn_hidden_size);
    KeptChannels { query_groups, heads, ffn_neurons }
}
