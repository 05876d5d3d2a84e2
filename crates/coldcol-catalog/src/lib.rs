//! Schema sources for cold column resolution
//!
//! This crate handles:
//! - The schema registry with its three provenance tiers
//! - Loading declared schemas from TOML, JSON and YAML files
//! - Column generators for tables created during a session
//!
//! ## Example
//!
//! ```rust,ignore
//! use coldcol_catalog::{SchemaRegistry, load_schema_file};
//!
//! let registry = SchemaRegistry::default();
//! registry.merge_schemas(load_schema_file(Path::new("schemas.toml"))?);
//! let columns = registry.find_columns(&"users".into());
//! ```

pub mod registry;
pub mod loader;
pub mod generator;

pub use registry::{SchemaRegistry, RegistryMatch, Tier};
pub use loader::{load_schema_dir, load_schema_file, parse_schemas, SchemaEntries, SchemaFormat, SchemaLoadError};
pub use generator::{ColumnSpec, TableGenerator};
