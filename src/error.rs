//! Error types for podar
//!
//! Every failure in a pruning run is fatal. Errors carry enough context to be
//! printed once at the CLI boundary and nothing retries them.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for podar operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while calibrating, pruning or saving a checkpoint
#[derive(Debug, Error)]
pub enum Error {
    /// The host cannot run the job (e.g. no accelerator)
    #[error("Environment error: {0}")]
    Environment(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A configuration value is out of range or inconsistent
    #[error("Invalid configuration value for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Calibration dataset could not be fetched or parsed
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Calibration dataset lacks the expected text column
    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { source_name: String, column: String },

    /// Checkpoint is missing files or holds inconsistent tensors
    #[error("Checkpoint error at {path}: {message}")]
    Checkpoint { path: PathBuf, message: String },

    /// Tensor shape does not match the configured dimensions
    #[error("Tensor shape mismatch for {tensor}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Structured pruning failed
    #[error("Pruning error: {0}")]
    Prune(String),

    /// Tokenizer could not be loaded or failed to encode
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Tensor or config serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Worker pool could not be built or the model is in the wrong state
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Shorthand for a checkpoint error at `path`
    pub fn checkpoint(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Checkpoint { path: path.into(), message: message.into() }
    }

    /// Shorthand for an invalid configuration value
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig { field: field.into(), message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_message() {
        let err = Error::Environment("GPU is required for the pruning.".into());
        assert_eq!(err.to_string(), "Environment error: GPU is required for the pruning.");
    }

    #[test]
    fn test_missing_column_message() {
        let err = Error::MissingColumn { source_name: "calib.jsonl".into(), column: "text".into() };
        assert_eq!(err.to_string(), "Column 'text' not found in calib.jsonl");
    }

    #[test]
    fn test_io_from() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_checkpoint_helper() {
        let err = Error::checkpoint("/tmp/ckpt", "missing model_config.yaml");
        assert!(err.to_string().contains("/tmp/ckpt"));
        assert!(err.to_string().contains("missing model_config.yaml"));
    }
}
