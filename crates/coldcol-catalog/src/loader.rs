//! Schema file ingestion
//!
//! A schema file maps table names to their columns:
//!
//! ```toml
//! [users.columns]
//! id = { type = "integer", primary_key = true }
//! name = { type = "string" }
//! ```
//!
//! The same layout is accepted as JSON or YAML. Column order follows the file. Entries
//! without a `columns` key degrade to an empty column list rather than failing
//! the whole file.

use coldcol_core::{Attributes, ColumnDescriptor, Diagnostic, DiagnosticCode, Location, Severity};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Declared schemas in file order: table name to ordered columns
pub type SchemaEntries = Vec<(String, Vec<ColumnDescriptor>)>;

/// Supported schema file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Toml,
    Json,
    Yaml,
}

impl SchemaFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Some(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parse schema declarations from a string
pub fn parse_schemas(contents: &str, format: SchemaFormat) -> Result<SchemaEntries, SchemaLoadError> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: Value = match format {
        SchemaFormat::Toml => {
            let table: toml::Table = toml::from_str(contents)
                .map_err(|e| SchemaLoadError::Parse(e.to_string()))?;
            serde_json::to_value(table)
                .map_err(|e| SchemaLoadError::Parse(e.to_string()))?
        }
        SchemaFormat::Json => serde_json::from_str(contents)
            .map_err(|e| SchemaLoadError::Parse(e.to_string()))?,
        SchemaFormat::Yaml => serde_yaml::from_str(contents)
            .map_err(|e| SchemaLoadError::Parse(e.to_string()))?,
    };

    match document {
        Value::Object(tables) => Ok(tables
            .into_iter()
            .map(|(table, info)| {
                let columns = columns_from_entry(&info);
                (table, columns)
            })
            .collect()),
        Value::Null => Ok(Vec::new()),
        other => Err(SchemaLoadError::Parse(format!(
            "expected a map of table names at the top level, found {}",
            json_kind(&other)
        ))),
    }
}

/// Load one schema file, choosing the format from its extension
pub fn load_schema_file(path: &Path) -> Result<SchemaEntries, SchemaLoadError> {
    let format = SchemaFormat::from_path(path)
        .ok_or_else(|| SchemaLoadError::UnsupportedFormat(path.to_path_buf()))?;

    let contents = std::fs::read_to_string(path)
        .map_err(|e| SchemaLoadError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let entries = parse_schemas(&contents, format).map_err(|e| e.in_file(path))?;
    tracing::debug!(path = %path.display(), tables = entries.len(), "loaded schema file");
    Ok(entries)
}

/// Load every schema file under `dir`, in path order
///
/// Later files replace same-named tables from earlier ones.
pub fn load_schema_dir(dir: &Path) -> Result<SchemaEntries, SchemaLoadError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| SchemaLoadError::Io {
            path: e.path().unwrap_or(dir).to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && SchemaFormat::from_path(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut entries = Vec::new();
    for path in &files {
        entries.extend(load_schema_file(path)?);
    }

    tracing::debug!(dir = %dir.display(), files = files.len(), tables = entries.len(), "loaded schema directory");
    Ok(entries)
}

fn columns_from_entry(info: &Value) -> Vec<ColumnDescriptor> {
    match info.get("columns") {
        Some(Value::Object(columns)) => columns
            .iter()
            .map(|(name, attrs)| ColumnDescriptor::new(name.clone()).with_attributes(attributes_of(attrs)))
            .collect(),
        // `columns = ["id", { name = "email", type = "string" }]`
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(ColumnDescriptor::new(name.clone())),
                Value::Object(fields) => {
                    let name = fields.get("name")?.as_str()?.to_string();
                    let mut attributes = fields.clone();
                    attributes.remove("name");
                    Some(ColumnDescriptor::new(name).with_attributes(attributes))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn attributes_of(value: &Value) -> Attributes {
    value.as_object().cloned().unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a map",
    }
}

/// Schema loading errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("Failed to read schema file {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse schema: {0}")]
    Parse(String),

    #[error("Failed to parse schema file {}: {message}", .path.display())]
    ParseFile { path: PathBuf, message: String },

    #[error("Unsupported schema file format: {} (expected .toml, .json, .yml or .yaml)", .0.display())]
    UnsupportedFormat(PathBuf),
}

impl SchemaLoadError {
    fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Parse(message) => Self::ParseFile {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        }
    }

    /// The file involved, if known
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Io { path, .. } | Self::ParseFile { path, .. } | Self::UnsupportedFormat(path) => Some(path.as_path()),
            Self::Parse(_) => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::new(DiagnosticCode::SchemaLoadError, Severity::Error, self.to_string());
        if let Some(path) = self.path() {
            diag = diag.with_location(Location::new(path.display().to_string()));
        }
        diag
    }
}
