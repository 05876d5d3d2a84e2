//! SQL parsing using datafusion-sqlparser-rs
//!
//! Parses SQL text into statements for lowering into query trees.

use coldcol_core::{Diagnostic, DiagnosticCode, DialectConfig, Location, Severity};
use sqlparser::ast::Statement;
use sqlparser::dialect::{BigQueryDialect, Dialect, GenericDialect, PostgreSqlDialect, SnowflakeDialect};
use sqlparser::parser::{Parser, ParserError};
use std::path::{Path, PathBuf};

/// SQL parser with configurable dialect
#[derive(Debug)]
pub struct SqlParser {
    dialect: Box<dyn Dialect + Send + Sync>,
}

impl SqlParser {
    /// Parser for the generic dialect
    pub fn new() -> Self {
        Self {
            dialect: Box::new(GenericDialect {}),
        }
    }

    /// Parser for BigQuery
    pub fn bigquery() -> Self {
        Self {
            dialect: Box::new(BigQueryDialect {}),
        }
    }

    /// Parser for PostgreSQL
    pub fn postgres() -> Self {
        Self {
            dialect: Box::new(PostgreSqlDialect {}),
        }
    }

    /// Parser for Snowflake
    pub fn snowflake() -> Self {
        Self {
            dialect: Box::new(SnowflakeDialect {}),
        }
    }

    /// Create a parser from a dialect config
    pub fn from_dialect(dialect: &DialectConfig) -> Self {
        match dialect {
            DialectConfig::BigQuery => Self::bigquery(),
            DialectConfig::Snowflake => Self::snowflake(),
            DialectConfig::Postgres => Self::postgres(),
            DialectConfig::Ansi => Self::new(),
        }
    }

    /// Parse SQL string into statements
    pub fn parse(&self, sql: &str, file_path: Option<&Path>) -> Result<ParsedSql, ParseError> {
        match Parser::parse_sql(&*self.dialect, sql) {
            Ok(statements) => Ok(ParsedSql {
                sql: sql.to_string(),
                statements,
                file_path: file_path.map(Path::to_path_buf),
            }),
            Err(error) => Err(ParseError {
                sql: sql.to_string(),
                error,
                file_path: file_path.map(Path::to_path_buf),
            }),
        }
    }

    /// Parse SQL from a file
    pub fn parse_file(&self, path: &Path) -> Result<ParsedSql, ParseError> {
        let sql = std::fs::read_to_string(path).map_err(|e| ParseError {
            sql: String::new(),
            error: ParserError::ParserError(format!("Failed to read file: {}", e)),
            file_path: Some(path.to_path_buf()),
        })?;

        self.parse(&sql, Some(path))
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Successfully parsed SQL
#[derive(Debug, Clone)]
pub struct ParsedSql {
    /// Original SQL string
    pub sql: String,

    /// Parsed statements
    pub statements: Vec<Statement>,

    /// Source file path (if parsed from file)
    pub file_path: Option<PathBuf>,
}

impl ParsedSql {
    /// Get the first statement
    pub fn first_statement(&self) -> Option<&Statement> {
        self.statements.first()
    }

    /// Count the number of statements
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

/// SQL parsing error with diagnostic information
#[derive(Debug)]
pub struct ParseError {
    /// Original SQL string
    pub sql: String,

    /// Parser error from sqlparser
    pub error: ParserError,

    /// Source file path
    pub file_path: Option<PathBuf>,
}

impl ParseError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::new(
            DiagnosticCode::SqlParseError,
            Severity::Error,
            format!("Failed to parse SQL: {}", self.error),
        );

        if let Some(path) = &self.file_path {
            diag = diag.with_location(Location::new(path.display().to_string()));
        }

        diag
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SQL parse error: {}", self.error)
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_select() {
        let parser = SqlParser::new();
        let parsed = parser.parse("SELECT col1 FROM tab1", None).unwrap();

        assert_eq!(parsed.statement_count(), 1);
        assert!(matches!(parsed.first_statement(), Some(Statement::Query(_))));
    }

    #[test]
    fn parse_with_cte() {
        let parser = SqlParser::new();
        let sql = r#"
            WITH cte1 AS (
                SELECT * FROM tab1
            )
            SELECT * FROM cte1
        "#;

        let parsed = parser.parse(sql, None).unwrap();
        assert!(matches!(parsed.first_statement(), Some(Statement::Query(_))));
    }

    #[test]
    fn parse_invalid_sql() {
        let parser = SqlParser::new();
        let error = parser.parse("SELECT FROM WHERE", None).unwrap_err();

        let diag = error.to_diagnostic();
        assert_eq!(diag.code, DiagnosticCode::SqlParseError);
        assert_eq!(diag.severity, Severity::Error);
        assert!(diag.location.is_none());
    }

    #[test]
    fn parse_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.sql");
        std::fs::write(&path, "SELECT FROM WHERE").unwrap();

        let diag = SqlParser::new().parse_file(&path).unwrap_err().to_diagnostic();
        assert_eq!(diag.location.unwrap().file, path.display().to_string());
    }

    #[test]
    fn different_dialects() {
        let sql = "SELECT id FROM users";

        for dialect in [DialectConfig::Ansi, DialectConfig::BigQuery, DialectConfig::Postgres, DialectConfig::Snowflake] {
            assert!(SqlParser::from_dialect(&dialect).parse(sql, None).is_ok());
        }
    }
}
