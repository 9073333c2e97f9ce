//! Load a job specification from YAML with command-line overrides

use super::overrides::apply_overrides;
use super::schema::PruneJobSpec;
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;

/// Load a job spec from a YAML file, applying `key=value` overrides
pub fn load_spec<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<PruneJobSpec> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
    })?;
    parse_spec(&content, overrides)
}

/// Parse a job spec from YAML text, applying `key=value` overrides
pub fn parse_spec(yaml: &str, overrides: &[String]) -> Result<PruneJobSpec> {
    let mut root: serde_yaml::Value = serde_yaml::from_str(yaml)
        .map_err(|e| Error::ConfigError(format!("Failed to parse YAML config: {e}")))?;

    apply_overrides(&mut root, overrides)?;

    serde_yaml::from_value(root)
        .map_err(|e| Error::ConfigError(format!("Invalid job specification: {e}")))
}
