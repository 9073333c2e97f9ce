//! Dotted `key=value` overrides applied to the raw YAML tree
//!
//! `prune.ffn_hidden_size=2048` walks (and creates) nested mappings and sets
//! the leaf. The right-hand side is parsed as a YAML scalar, so `true`, `16`
//! and `0.5` become typed values and anything unparsable stays a string.

use crate::error::{Error, Result};
use serde_yaml::{Mapping, Value};

/// A parsed `path=value` override
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Key path, e.g. `["prune", "ffn_hidden_size"]`
    pub path: Vec<String>,
    /// Parsed value
    pub value: Value,
}

impl Override {
    /// Parse `a.b.c=value`
    pub fn parse(raw: &str) -> Result<Self> {
        let (key, value) = raw.split_once('=').ok_or_else(|| {
            Error::ConfigError(format!("Override '{raw}' must have the form key.path=value"))
        })?;

        let path: Vec<String> = key.trim().split('.').map(str::to_string).collect();
        if path.iter().any(String::is_empty) {
            return Err(Error::ConfigError(format!("Override '{raw}' has an empty key segment")));
        }

        let value = parse_scalar(value.trim());
        Ok(Self { path, value })
    }

    /// Set the override on `root`, creating intermediate mappings
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        let mut node = root;
        let (leaf, parents) = self
            .path
            .split_last()
            .ok_or_else(|| Error::ConfigError("Override with empty path".into()))?;

        for segment in parents {
            if node.is_null() {
                *node = Value::Mapping(Mapping::new());
            }
            let mapping = node.as_mapping_mut().ok_or_else(|| {
                Error::ConfigError(format!(
                    "Cannot override '{}': '{segment}' is not a mapping",
                    self.path.join(".")
                ))
            })?;
            node = mapping
                .entry(Value::from(segment.as_str()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }

        if node.is_null() {
            *node = Value::Mapping(Mapping::new());
        }
        let mapping = node.as_mapping_mut().ok_or_else(|| {
            Error::ConfigError(format!(
                "Cannot override '{}': parent is not a mapping",
                self.path.join(".")
            ))
        })?;
        mapping.insert(Value::from(leaf.as_str()), self.value.clone());
        Ok(())
    }
}

fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null | Value::String(_))) => value,
        Ok(Value::Sequence(seq)) => Value::Sequence(seq),
        _ => Value::String(raw.to_string()),
    }
}

/// Apply every override in order; later ones win
pub fn apply_overrides(root: &mut Value, overrides: &[String]) -> Result<()> {
    for raw in overrides {
        Override::parse(raw)?.apply(root)?;
    }
    Ok(())
}
