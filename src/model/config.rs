//! Checkpoint model configuration
//!
//! The stored config is an ordered YAML mapping of hyperparameters. It is kept
//! untyped so keys this crate does not interpret survive a load/save cycle.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Backend tag forced onto every merged config
pub const BACKEND_NAME: &str = "modelopt";

/// Ordered mapping of model hyperparameters
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelConfig(Mapping);

impl ModelConfig {
    /// Wrap an existing mapping
    pub fn from_mapping(mapping: Mapping) -> Self {
        Self(mapping)
    }

    /// Parse a YAML document whose root is a mapping
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(mapping) => Ok(Self(mapping)),
            Value::Null => Ok(Self::default()),
            other => Err(Error::ConfigError(format!(
                "Model config must be a mapping, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Underlying mapping
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert or replace a key
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(Value::from(key), value.into());
    }

    /// Shallow update: every top-level key in `overrides` replaces ours
    pub fn update(&mut self, overrides: &Mapping) {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Backend tag, if set
    pub fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }

    /// Non-negative integer field; `None` when missing or null
    pub fn usize_field(&self, key: &str) -> Result<Option<usize>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_u64()
                .and_then(|v| usize::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| {
                    Error::invalid_config(
                        key,
                        format!("expected a non-negative integer, found {}", value_kind(value)),
                    )
                }),
        }
    }

    /// Integer field that must be present
    pub fn require_usize(&self, key: &str) -> Result<usize> {
        self.usize_field(key)?
            .ok_or_else(|| Error::invalid_config(key, "missing from model config"))
    }

    /// Float field; integers are accepted
    pub fn f32_field(&self, key: &str) -> Result<Option<f32>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_f64().map(|v| Some(v as f32)).ok_or_else(|| {
                Error::invalid_config(key, format!("expected a number, found {}", value_kind(value)))
            }),
        }
    }

    /// Boolean field
    pub fn bool_field(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_bool().map(Some).ok_or_else(|| {
                Error::invalid_config(key, format!("expected a boolean, found {}", value_kind(value)))
            }),
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Merge the stored checkpoint config with the user's `model.*` group
///
/// Top-level keys from `overrides` win, then the backend tag is forced to
/// [`BACKEND_NAME`] regardless of what either side said.
pub fn merge_config(stored: ModelConfig, overrides: &Mapping) -> ModelConfig {
    let mut merged = stored;
    merged.update(overrides);
    merged.set("name", BACKEND_NAME);
    merged
}
