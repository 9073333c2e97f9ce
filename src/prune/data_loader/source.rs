//! Calibration data sources.

use std::fmt;
use std::path::PathBuf;

/// A dataset hosted on the Hugging Face Hub as parquet shards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubDataset {
    /// Short name accepted in `prune.calib_dataset`
    pub name: &'static str,
    pub repo_id: &'static str,
    pub revision: &'static str,
    /// Path prefix of the train-split shards inside the repo
    pub shard_prefix: &'static str,
    /// Column holding the text
    pub column: &'static str,
}

impl HubDataset {
    /// Whether a repo file is one of this dataset's shards
    pub fn is_shard(&self, rfilename: &str) -> bool {
        rfilename.starts_with(self.shard_prefix) && rfilename.ends_with(".parquet")
    }
}

pub const WIKITEXT: HubDataset = HubDataset {
    name: "wikitext",
    repo_id: "Salesforce/wikitext",
    revision: "main",
    shard_prefix: "wikitext-103-v1/train-",
    column: "text",
};

pub const CNN_DAILYMAIL: HubDataset = HubDataset {
    name: "cnn_dailymail",
    repo_id: "abisee/cnn_dailymail",
    revision: "main",
    shard_prefix: "3.0.0/train-",
    column: "article",
};

// Only the auto-converted parquet branch of this repo is readable as parquet.
pub const PILE: HubDataset = HubDataset {
    name: "pile",
    repo_id: "monology/pile-uncopyrighted",
    revision: "refs/convert/parquet",
    shard_prefix: "default/partial-train/",
    column: "text",
};

/// Every named source, in the order they are listed to users
pub const NAMED_SOURCES: [HubDataset; 3] = [WIKITEXT, CNN_DAILYMAIL, PILE];

/// Column read from local JSON files
pub const JSON_TEXT_COLUMN: &str = "text";

/// Resolved calibration data source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalibrationSource {
    Hub(HubDataset),
    /// JSON lines, or one top-level array of objects
    JsonFile(PathBuf),
}

impl CalibrationSource {
    /// Resolve a dataset identifier; anything that is not a known name is a path
    pub fn parse(dataset: &str) -> Self {
        NAMED_SOURCES
            .iter()
            .find(|source| source.name == dataset)
            .map_or_else(|| Self::JsonFile(PathBuf::from(dataset)), |source| Self::Hub(*source))
    }

    /// Name of the text column
    pub fn column(&self) -> &str {
        match self {
            Self::Hub(dataset) => dataset.column,
            Self::JsonFile(_) => JSON_TEXT_COLUMN,
        }
    }

    pub fn is_hub(&self) -> bool {
        matches!(self, Self::Hub(_))
    }
}

impl fmt::Display for CalibrationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hub(dataset) => write!(f, "{} ({})", dataset.name, dataset.repo_id),
            Self::JsonFile(path) => write!(f, "{}", path.display()),
        }
    }
}
