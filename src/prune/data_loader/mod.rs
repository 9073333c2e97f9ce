//! Calibration data loader for pruning
//!
//! Turns a dataset identifier into a finite sequence of equally sized text
//! batches. Named sources are read from parquet shards on the Hugging Face
//! Hub; anything else is a local JSON file with a `text` field.
//!
//! # Example
//!
//! ```ignore
//! use podar::prune::{CalibrationDataConfig, CalibrationDataLoader};
//!
//! let config = CalibrationDataConfig::new()
//!     .with_dataset("cnn_dailymail")
//!     .with_batch_size(64)
//!     .with_calib_size(512);
//!
//! for batch in CalibrationDataLoader::new(config)?.load()? {
//!     // 64 articles of at most 512 characters each
//! }
//! ```

mod config;
mod iter;
mod loader;
mod reader;
mod source;


pub use config::CalibrationDataConfig;
pub use iter::{truncate_chars, CalibrationBatches};
pub use loader::{batches_from_texts, effective_calib_size, get_calib_dataloader, CalibrationDataLoader};
pub use source::{CalibrationSource, HubDataset, CNN_DAILYMAIL, NAMED_SOURCES, PILE, WIKITEXT};
