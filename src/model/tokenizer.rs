//! Calibration tokenizer
//!
//! Uses the checkpoint's `tokenizer.json` when present. Without one, text is
//! encoded byte by byte and folded into the model's vocabulary, which is
//! enough to drive activations for importance estimation.

use crate::error::{Error, Result};
use std::path::Path;
use tokenizers::Tokenizer;

/// BOS spellings tried in order when the tokenizer has no post-processor
const BOS_CANDIDATES: [&str; 4] = ["<s>", "<|begin_of_text|>", "<bos>", "<|endoftext|>"];

/// Tokenizer used to turn calibration text into ids
pub enum CalibrationTokenizer {
    /// HuggingFace tokenizers (from tokenizer.json)
    HuggingFace(Box<Tokenizer>),
    /// Raw UTF-8 bytes modulo the vocabulary size
    Bytes { vocab_size: usize },
}

impl CalibrationTokenizer {
    /// Load `tokenizer.json`
    pub fn from_file(path: &Path) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path).map_err(|e| {
            Error::Tokenizer(format!("Failed to load {}: {e}", path.display()))
        })?;
        Ok(Self::HuggingFace(Box::new(tokenizer)))
    }

    /// Byte-level fallback for a vocabulary of `vocab_size`
    pub fn bytes(vocab_size: usize) -> Self {
        Self::Bytes { vocab_size: vocab_size.max(1) }
    }

    /// Encode text without special tokens
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        match self {
            Self::HuggingFace(tokenizer) => tokenizer
                .encode(text, false)
                .map(|encoding| encoding.get_ids().to_vec())
                .map_err(|e| Error::Tokenizer(format!("Failed to encode text: {e}"))),
            Self::Bytes { vocab_size } => {
                Ok(text.bytes().map(|b| (b as usize % vocab_size) as u32).collect())
            }
        }
    }

    /// Id of the beginning-of-sequence token, if the tokenizer defines one
    pub fn bos_id(&self) -> Option<u32> {
        match self {
            Self::HuggingFace(tokenizer) => {
                BOS_CANDIDATES.iter().find_map(|token| tokenizer.token_to_id(token))
            }
            Self::Bytes { .. } => None,
        }
    }

    /// Whether this is the byte-level fallback
    pub fn is_byte_level(&self) -> bool {
        matches!(self, Self::Bytes { .. })
    }
}

impl std::fmt::Debug for CalibrationTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HuggingFace(tokenizer) => f
                .debug_struct("HuggingFace")
                .field("vocab_size", &tokenizer.get_vocab_size(true))
                .finish(),
            Self::Bytes { vocab_size } => {
                f.debug_struct("Bytes").field("vocab_size", vocab_size).finish()
            }
        }
    }
}
