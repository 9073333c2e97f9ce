//! Target width of a pruned model

use crate::config::PruneSpec;
use crate::error::{Error, Result};
use crate::model::GptDims;
use serde::{Deserialize, Serialize};

/// Width the pruned model must end up with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConstraints {
    pub ffn_hidden_size: usize,
    pub num_attention_heads: usize,
    pub num_query_groups: usize,
}

impl ExportConstraints {
    pub fn from_spec(spec: &PruneSpec) -> Self {
        Self {
            ffn_hidden_size: spec.ffn_hidden_size,
            num_attention_heads: spec.num_attention_heads,
            num_query_groups: spec.num_query_groups,
        }
    }

    /// Current width of a model, as constraints
    pub fn of(dims: &GptDims) -> Self {
        Self {
            ffn_hidden_size: dims.ffn_hidden_size,
            num_attention_heads: dims.num_attention_heads,
            num_query_groups: dims.num_query_groups,
        }
    }

    /// Heads per query group after pruning
    pub fn heads_per_group(&self) -> usize {
        self.num_attention_heads / self.num_query_groups.max(1)
    }

    /// Check that a model of width `dims` can be cut down to these targets
    pub fn check_against(&self, dims: &GptDims) -> Result<()> {
        let targets = [
            ("ffn_hidden_size", self.ffn_hidden_size, dims.ffn_hidden_size),
            ("num_attention_heads", self.num_attention_heads, dims.num_attention_heads),
            ("num_query_groups", self.num_query_groups, dims.num_query_groups),
        ];
        for (name, target, current) in targets {
            if target == 0 {
                return Err(Error::Prune(format!("target {name} must be > 0")));
            }
            if target > current {
                return Err(Error::Prune(format!(
                    "target {name} ({target}) exceeds the model's {current}"
                )));
            }
        }
        if self.num_attention_heads % self.num_query_groups != 0 {
            return Err(Error::Prune(format!(
                "target num_attention_heads ({}) is not divisible by num_query_groups ({})",
                self.num_attention_heads, self.num_query_groups
            )));
        }
        // heads are only dropped inside kept groups
        if self.heads_per_group() > dims.heads_per_group() {
            return Err(Error::Prune(format!(
                "target keeps {} heads per query group, the model only has {}",
                self.heads_per_group(),
                dims.heads_per_group()
            )));
        }
        Ok(())
    }
}
