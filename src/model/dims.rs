//! Typed architecture dimensions derived from a [`ModelConfig`]

use super::config::ModelConfig;
use crate::error::{Error, Result};

/// Width and depth of a GPT-style decoder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GptDims {
    pub hidden_size: usize,
    pub ffn_hidden_size: usize,
    pub num_attention_heads: usize,
    pub num_query_groups: usize,
    /// Per-head dimension of queries, keys and values
    pub kv_channels: usize,
    pub num_layers: usize,
    pub layernorm_epsilon: f32,
    pub rotary_base: f32,
    /// Output projection tied to the embedding table
    pub share_embeddings: bool,
}

impl GptDims {
    /// Read the dimensions from a model config
    ///
    /// `num_query_groups` defaults to `num_attention_heads` (plain multi-head
    /// attention) and `kv_channels` to `hidden_size / num_attention_heads`.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let hidden_size = config.require_usize("hidden_size")?;
        let num_attention_heads = config.require_usize("num_attention_heads")?;
        if num_attention_heads == 0 {
            return Err(Error::invalid_config("num_attention_heads", "must be > 0"));
        }
        let num_query_groups =
            config.usize_field("num_query_groups")?.unwrap_or(num_attention_heads);
        let kv_channels = match config.usize_field("kv_channels")? {
            Some(kv) => kv,
            None => default_kv_channels(hidden_size, num_attention_heads),
        };

        let dims = Self {
            hidden_size,
            ffn_hidden_size: config.require_usize("ffn_hidden_size")?,
            num_attention_heads,
            num_query_groups,
            kv_channels,
            num_layers: config.require_usize("num_layers")?,
            layernorm_epsilon: config.f32_field("layernorm_epsilon")?.unwrap_or(1e-5),
            rotary_base: config.f32_field("rotary_base")?.unwrap_or(10_000.0),
            share_embeddings: config
                .bool_field("share_embeddings_and_output_weights")?
                .unwrap_or(false),
        };
        dims.check()?;
        Ok(dims)
    }

    fn check(&self) -> Result<()> {
        if self.hidden_size == 0 {
            return Err(Error::invalid_config("hidden_size", "must be > 0"));
        }
        if self.ffn_hidden_size == 0 {
            return Err(Error::invalid_config("ffn_hidden_size", "must be > 0"));
        }
        if self.num_query_groups == 0 || self.num_attention_heads % self.num_query_groups != 0 {
            return Err(Error::invalid_config(
                "num_query_groups",
                format!(
                    "{} does not divide num_attention_heads ({})",
                    self.num_query_groups, self.num_attention_heads
                ),
            ));
        }
        // rotary embeddings rotate channel pairs
        if self.kv_channels == 0 || self.kv_channels % 2 != 0 {
            return Err(Error::invalid_config(
                "kv_channels",
                format!("{} must be a positive even number", self.kv_channels),
            ));
        }
        Ok(())
    }

    /// Heads sharing one key/value projection
    pub fn heads_per_group(&self) -> usize {
        self.num_attention_heads / self.num_query_groups
    }

    /// Output rows of the query projection
    pub fn q_dim(&self) -> usize {
        self.num_attention_heads * self.kv_channels
    }

    /// Output rows of each key/value projection
    pub fn kv_dim(&self) -> usize {
        self.num_query_groups * self.kv_channels
    }

    /// Same dims with a new width
    pub fn with_width(mut self, ffn: usize, heads: usize, groups: usize) -> Self {
        self.ffn_hidden_size = ffn;
        self.num_attention_heads = heads;
        self.num_query_groups = groups;
        self
    }
}

/// `hidden_size / num_attention_heads`, the per-head width of an unpruned model
pub fn default_kv_channels(hidden_size: usize, num_attention_heads: usize) -> usize {
    hidden_size / num_attention_heads.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(extra: &str) -> ModelConfig {
        ModelConfig::from_yaml(&format!(
            "hidden_size: 64\nffn_hidden_size: 256\nnum_attention_heads: 8\nnum_layers: 2\n{extra}"
        ))
        .unwrap()
    }

    #[test]
    fn test_defaults() {
        let dims = GptDims::from_config(&config("")).unwrap();
        assert_eq!(dims.num_query_groups, 8);
        assert_eq!(dims.kv_channels, 8);
        assert_eq!(dims.heads_per_group(), 1);
        assert!((dims.layernorm_epsilon - 1e-5).abs() < f32::EPSILON);
        assert!(!dims.share_embeddings);
    }

    #[test]
    fn test_gqa_dims() {
        let dims = GptDims::from_config(&config("num_query_groups: 2\nkv_channels: 16\n")).unwrap();
        assert_eq!(dims.heads_per_group(), 4);
        assert_eq!(dims.q_dim(), 128);
        assert_eq!(dims.kv_dim(), 32);
    }

    #[test]
    fn test_groups_must_divide_heads() {
        assert!(GptDims::from_config(&config("num_query_groups: 3\n")).is_err());
    }

    #[test]
    fn test_odd_kv_channels_rejected() {
        assert!(GptDims::from_config(&config("kv_channels: 7\n")).is_err());
    }

    #[test]
    fn test_missing_field() {
        let cfg = ModelConfig::from_yaml("hidden_size: 64\nnum_attention_heads: 8\n").unwrap();
        let err = GptDims::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("ffn_hidden_size"));
    }

    #[test]
    fn test_default_kv_channels() {
        assert_eq!(default_kv_channels(4096, 32), 128);
        assert_eq!(default_kv_channels(64, 0), 64);
    }
}
