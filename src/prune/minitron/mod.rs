//! Minitron structured width pruning
//!
//! Calibrate, rank channels by activation importance, then slice every
//! decoder layer to the target FFN size, head count and query-group count.
//! Hidden size, depth and head dimension are left alone.

mod constraints;
mod importance;
mod mode;
mod pruner;


pub use constraints::ExportConstraints;
pub use importance::{group_scores, select_layer, top_k};
pub use mode::PruneMode;
pub use pruner::{prune, MinitronPruner, PruneReport, StructuredPruner};
