//! Cold column resolution for SQL query trees
//!
//! This crate handles:
//! - The query tree model (select lists, FROM/JOIN sources, WITH bindings)
//! - Resolving a query's output column names against a schema registry
//! - Parsing SQL with datafusion-sqlparser-rs and lowering it to query trees
//! - Session handles that record created tables and views

pub mod query;
pub mod resolver;
pub mod parser;
pub mod lower;
pub mod session;

pub use query::{CteBinding, Expr, Join, JoinKind, QueryError, QueryNode, SelectItem, Source, SourceTarget};
pub use resolver::{ColumnResolver, UnresolvableColumnsError};
pub use parser::{SqlParser, ParsedSql, ParseError};
pub use lower::{lower_command, lower_query, lower_statement, Command, LowerError};
pub use session::{Outcome, Session, SessionError, ViewOptions, ViewSource};
