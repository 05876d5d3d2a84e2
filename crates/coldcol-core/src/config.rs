//! Configuration schema (coldcol.toml)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::ident::IdentifierQuoting;

/// Default bound on nested resolution depth
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// SQL dialect configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectConfig {
    /// BigQuery SQL dialect
    BigQuery,

    /// Snowflake SQL dialect
    Snowflake,

    /// PostgreSQL SQL dialect
    Postgres,

    /// Generic ANSI SQL
    #[default]
    Ansi,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// SQL dialect used by the SQL front end
    #[serde(default)]
    pub dialect: DialectConfig,

    /// Quoting style for canonical literal names
    #[serde(default)]
    pub quoting: IdentifierQuoting,

    /// Schema files loaded into the declared tier, in order
    #[serde(default)]
    pub schema_files: Vec<PathBuf>,

    /// Maximum nesting depth the resolver will follow
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dialect: DialectConfig::default(),
            quoting: IdentifierQuoting::default(),
            schema_files: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        // Relative schema paths are resolved against the config file's directory
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.project_root = std::env::current_dir().unwrap_or_default();
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Schema file paths with relative entries anchored at the project root
    pub fn schema_paths(&self) -> Vec<PathBuf> {
        self.schema_files
            .iter()
            .map(|p| {
                if p.is_relative() {
                    self.project_root.join(p)
                } else {
                    p.clone()
                }
            })
            .collect()
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
