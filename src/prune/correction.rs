//! Post-prune config correction
//!
//! The pruner changes the weights; the stored config must be told. Four
//! fields are overwritten with the pruned width, and `kv_channels` is pinned
//! to the per-head width of the unpruned model so it does not get re-derived
//! from the smaller head count.

use crate::error::Result;
use crate::model::{default_kv_channels, ModelConfig};
use crate::prune::minitron::ExportConstraints;

/// Field values written onto the pruned model's config
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostPruneCorrection {
    pub ffn_hidden_size: usize,
    pub num_attention_heads: usize,
    pub num_query_groups: usize,
    pub kv_channels: usize,
}

impl PostPruneCorrection {
    /// Derive the correction from the merged (pre-prune) config
    ///
    /// `kv_channels` comes from the merged config when set and non-null,
    /// else `hidden_size / num_attention_heads` of the original model.
    pub fn from_job(merged: &ModelConfig, constraints: &ExportConstraints) -> Result<Self> {
        let kv_channels = match merged.usize_field("kv_channels")? {
            Some(kv) => kv,
            None => default_kv_channels(
                merged.require_usize("hidden_size")?,
                merged.require_usize("num_attention_heads")?,
            ),
        };
        Ok(Self {
            ffn_hidden_size: constraints.ffn_hidden_size,
            num_attention_heads: constraints.num_attention_heads,
            num_query_groups: constraints.num_query_groups,
            kv_channels,
        })
    }

    /// Overwrite the four fields; applying twice is the same as once
    pub fn apply(&self, config: &mut ModelConfig) {
        config.set("ffn_hidden_size", self.ffn_hidden_size as u64);
        config.set("num_attention_heads", self.num_attention_heads as u64);
        config.set("num_query_groups", self.num_query_groups as u64);
        config.set("kv_channels", self.kv_channels as u64);
    }
}
