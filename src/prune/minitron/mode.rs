//! Pruning mode enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Structured pruning algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PruneMode {
    /// Minitron width pruning of a Megatron-core style GPT: removes FFN
    /// neurons, attention heads and query groups by activation importance.
    #[default]
    #[serde(rename = "mcore_gpt_minitron")]
    McoreGptMinitron,
}

impl PruneMode {
    /// Identifier used in configs and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            PruneMode::McoreGptMinitron => "mcore_gpt_minitron",
        }
    }

    /// Get the display name for this mode.
    pub fn display_name(&self) -> &'static str {
        match self {
            PruneMode::McoreGptMinitron => "Minitron (Width)",
        }
    }
}

impl fmt::Display for PruneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PruneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcore_gpt_minitron" => Ok(PruneMode::McoreGptMinitron),
            _ => Err(format!("Unknown prune mode: {s}. Valid modes: mcore_gpt_minitron")),
        }
    }
}
