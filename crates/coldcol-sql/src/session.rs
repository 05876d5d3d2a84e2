//! Session handle
//!
//! A `Session` owns the schema registry for one logical database connection.
//! Schema loading, DDL rendering and column resolution all go through it, and
//! DDL that creates a table or view records the new relation's columns so
//! later queries can select from it.

use crate::lower::{lower_command, lower_statement, Command, LowerError};
use crate::parser::{ParseError, SqlParser};
use crate::query::QueryNode;
use crate::resolver::{ColumnResolver, UnresolvableColumnsError};
use coldcol_catalog::{load_schema_dir, load_schema_file, SchemaEntries, SchemaLoadError, SchemaRegistry, TableGenerator};
use coldcol_core::{columns_from_names, ColumnDescriptor, Config, Diagnostic, DiagnosticCode, Severity, TableName};
use std::path::Path;
use std::sync::Arc;

/// Body of a CREATE VIEW
#[derive(Debug, Clone)]
pub enum ViewSource {
    /// A query tree, whose columns can be resolved
    Query(QueryNode),

    /// Raw SQL text, which is never introspected
    Sql(String),
}

impl From<QueryNode> for ViewSource {
    fn from(query: QueryNode) -> Self {
        Self::Query(query)
    }
}

/// Options for CREATE VIEW
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Create the view without recording its columns
    pub dont_record: bool,
}

/// Result of applying a `Command`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Output columns of a query
    Columns(Vec<String>),

    /// A table or view was created and recorded under `literal`
    Created { literal: String, columns: Vec<String> },
}

/// Session owning a schema registry
#[derive(Debug)]
pub struct Session {
    config: Config,
    registry: Arc<SchemaRegistry>,
    parser: SqlParser,
}

impl Session {
    /// Create a session with an empty registry
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(SchemaRegistry::new(config.quoting));
        let parser = SqlParser::from_dialect(&config.dialect);
        Self { config, registry, parser }
    }

    /// Create a session and load every schema file the config lists
    pub fn from_config(config: Config) -> Result<Self, SessionError> {
        let session = Self::new(config);
        for path in session.config.schema_paths() {
            if path.is_dir() {
                session.load_schema_dir(&path)?;
            } else {
                session.load_schema(&path)?;
            }
        }
        Ok(session)
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared registry handle
    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Resolver bound to this session's registry
    pub fn resolver(&self) -> ColumnResolver<'_> {
        ColumnResolver::new(&self.registry).with_max_depth(self.config.max_depth)
    }

    /// Merge a schema file into the declared tier, returning the table count
    pub fn load_schema(&self, path: &Path) -> Result<usize, SchemaLoadError> {
        let entries = load_schema_file(path)?;
        Ok(self.merge(entries))
    }

    /// Merge every schema file under `dir`, returning the table count
    pub fn load_schema_dir(&self, dir: &Path) -> Result<usize, SchemaLoadError> {
        let entries = load_schema_dir(dir)?;
        Ok(self.merge(entries))
    }

    fn merge(&self, entries: SchemaEntries) -> usize {
        let count = entries.len();
        self.registry.merge_schemas(entries);
        count
    }

    /// Declare the columns of a table by hand
    pub fn add_table_schema(&self, name: impl Into<TableName>, columns: Vec<ColumnDescriptor>) {
        self.registry.add_schema(name, columns);
    }

    /// Render CREATE TABLE and record the declared columns
    pub fn create_table(&self, name: impl Into<TableName>, generator: &TableGenerator) -> String {
        let literal = self.registry.literal(&name.into());
        let sql = generator.create_table_sql(&literal, self.registry.quoting());
        self.registry.add_created_table(literal, generator.descriptors());
        sql
    }

    /// Render CREATE TABLE ... AS and record the query's columns
    pub fn create_table_as(&self, name: impl Into<TableName>, query: &QueryNode) -> Result<String, UnresolvableColumnsError> {
        let literal = self.registry.literal(&name.into());
        let columns = self.columns(query)?;
        let sql = format!("CREATE TABLE {} AS {}", literal, query);
        self.registry.add_created_table(literal, columns_from_names(columns));
        Ok(sql)
    }

    /// Render CREATE VIEW and, unless disabled, record the view's columns
    pub fn create_view(
        &self,
        name: impl Into<TableName>,
        source: impl Into<ViewSource>,
        options: ViewOptions,
    ) -> Result<String, UnresolvableColumnsError> {
        let literal = self.registry.literal(&name.into());
        let source = source.into();
        let body = match &source {
            ViewSource::Query(query) => query.to_string(),
            ViewSource::Sql(sql) => sql.clone(),
        };
        let sql = format!("CREATE VIEW {} AS {}", literal, body);

        if options.dont_record {
            tracing::debug!(view = %literal, "view created without recording columns");
            return Ok(sql);
        }

        let columns = match &source {
            ViewSource::Query(query) => self.columns(query)?,
            ViewSource::Sql(sql) => return Err(UnresolvableColumnsError::Opaque(sql.clone())),
        };
        self.registry.add_created_view(literal, columns_from_names(columns));
        Ok(sql)
    }

    /// Output columns of a query tree
    pub fn columns(&self, query: &QueryNode) -> Result<Vec<String>, UnresolvableColumnsError> {
        self.resolver().columns(query)
    }

    /// Parse one SQL query into a query tree
    pub fn parse(&self, sql: &str) -> Result<QueryNode, SessionError> {
        let parsed = self.parser.parse(sql, None)?;
        match (parsed.statement_count(), parsed.first_statement()) {
            (1, Some(statement)) => Ok(lower_statement(statement)?),
            (count, _) => Err(SessionError::StatementCount(count)),
        }
    }

    /// Output columns of one SQL query
    pub fn columns_for_sql(&self, sql: &str) -> Result<Vec<String>, SessionError> {
        let query = self.parse(sql)?;
        Ok(self.columns(&query)?)
    }

    /// Apply a lowered statement
    pub fn execute(&self, command: Command) -> Result<Outcome, UnresolvableColumnsError> {
        match command {
            Command::Query(query) => self.columns(&query).map(Outcome::Columns),
            Command::CreateTable { name, generator } => {
                let literal = self.registry.literal(&name);
                self.create_table(name, &generator);
                let columns = generator.columns().iter().map(|c| c.name.clone()).collect();
                Ok(Outcome::Created { literal, columns })
            }
            Command::CreateTableAs { name, query } => {
                let literal = self.registry.literal(&name);
                self.create_table_as(name, &query)?;
                let columns = self.columns(&query)?;
                Ok(Outcome::Created { literal, columns })
            }
            Command::CreateView { name, query } => {
                let literal = self.registry.literal(&name);
                let columns = self.columns(&query)?;
                self.create_view(name, query, ViewOptions::default())?;
                Ok(Outcome::Created { literal, columns })
            }
        }
    }

    /// Parse a SQL script and apply each statement in order
    ///
    /// Statements are independent: a failing statement is reported in its
    /// slot and later statements still run. Only a parse failure of the whole
    /// script is returned as an outer error.
    pub fn execute_script(&self, sql: &str, file_path: Option<&Path>) -> Result<Vec<Result<Outcome, SessionError>>, ParseError> {
        let parsed = self.parser.parse(sql, file_path)?;
        Ok(parsed
            .statements
            .iter()
            .map(|statement| {
                let command = lower_command(statement)?;
                Ok(self.execute(command)?)
            })
            .collect())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Errors from session operations that take SQL text or files
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Lower(#[from] LowerError),

    #[error(transparent)]
    Columns(#[from] UnresolvableColumnsError),

    #[error(transparent)]
    Schema(#[from] SchemaLoadError),

    #[error("Expected exactly one SQL statement, found {0}")]
    StatementCount(usize),
}

impl SessionError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::Parse(e) => e.to_diagnostic(),
            Self::Lower(e) => e.to_diagnostic(),
            Self::Columns(e) => e.to_diagnostic(),
            Self::Schema(e) => e.to_diagnostic(),
            Self::StatementCount(_) => {
                Diagnostic::new(DiagnosticCode::SqlUnsupportedSyntax, Severity::Error, self.to_string())
            }
        }
    }
}
