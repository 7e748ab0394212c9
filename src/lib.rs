pub mod config;
pub mod delta;
pub mod devlog;
pub mod errors;
pub mod logger;
pub mod path;
pub mod query;
pub mod record;
pub mod schema;
pub mod update;

pub use config::{Limits, OdmConfig, load_config};
pub use delta::{Delta, absorb, apply_path, apply_path_with, diff};
pub use errors::OdmError;
pub use path::{Path, Segment};
pub use query::{Expression, Field, compile, invert};
pub use record::{Record, Snapshot};
pub use schema::{FieldDescriptor, FieldKind, Schema, SchemaRegistry, SchemaSource};
pub use update::{UpdateExpression, UpdateOp, merge};

/// Initializes the mapper.
///
/// Loads configuration (see [`load_config`]) and sets up logging from it.
/// Logging may already be configured by the host; that is not an error.
///
/// # Errors
/// Returns an error if a configuration file exists but cannot be parsed.
pub fn init() -> Result<OdmConfig, Box<dyn std::error::Error>> {
    let cfg = load_config(None)?;
    logger::configure_from_config(&cfg.logging)?;
    Ok(cfg)
}
