//! Declarative job configuration
//!
//! A pruning job is a YAML file plus dotted `key=value` overrides from the
//! command line. Overrides are applied to the raw YAML tree, then the tree is
//! deserialized into a [`PruneJobSpec`] and validated.

mod cli;
mod loader;
mod overrides;
mod schema;
mod validate;

pub use cli::{
    parse_args, Cli, Command, InfoArgs, InitArgs, InspectArgs, OutputFormat, PruneArgs,
    ValidateArgs,
};
pub use loader::{load_spec, parse_spec};
pub use overrides::{apply_overrides, Override};
pub use schema::{
    AcceleratorKind, DataSpec, ExportSpec, InferenceSettings, ModelSpec, Precision, PruneJobSpec,
    PruneSpec, TrainerSpec, DEFAULT_JOB_YAML,
};
pub use validate::{validate_spec, ValidationError, DECODER_TYPES};
