//! coldcol core
//!
//! Shared domain types: identifiers, column descriptors, configuration and
//! diagnostics. Never rename diagnostic codes - they are part of the public API.

pub mod diagnostic;
pub mod ident;
pub mod schema;
pub mod report;
pub mod config;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity, Location};
pub use ident::{IdentifierQuoting, TableName};
pub use schema::{Attributes, ColumnDescriptor, column_names, columns_from_names};
pub use report::{Report, ReportSummary, ReportVersion, ResolvedQuery};
pub use config::{Config, ConfigError, DialectConfig, DEFAULT_MAX_DEPTH};
