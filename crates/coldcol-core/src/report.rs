//! Check report (stable v1)
//!
//! Breaking changes to this layout require a new version.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Total number of diagnostics
    pub total: usize,

    /// Number of errors
    pub errors: usize,

    /// Number of warnings
    pub warnings: usize,

    /// Number of info messages
    pub info: usize,

    /// Number of queries analyzed
    pub queries_checked: usize,

    /// Number of queries whose columns were fully resolved
    pub queries_resolved: usize,
}

/// Columns resolved for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedQuery {
    /// Where the query came from (file path or `<inline>`)
    pub source: String,

    /// Output columns in order
    pub columns: Vec<String>,
}

/// Check report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// Successfully resolved queries
    pub resolved: Vec<ResolvedQuery>,

    /// All diagnostics
    pub diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            resolved: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record a query whose columns were resolved
    pub fn add_resolved(&mut self, source: impl Into<String>, columns: Vec<String>) {
        self.summary.queries_checked += 1;
        self.summary.queries_resolved += 1;
        self.resolved.push(ResolvedQuery {
            source: source.into(),
            columns,
        });
    }

    /// Record a query that failed with the given diagnostic
    pub fn add_failure(&mut self, diagnostic: Diagnostic) {
        self.summary.queries_checked += 1;
        self.add_diagnostic(diagnostic);
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => self.summary.errors += 1,
            Severity::Warn => self.summary.warnings += 1,
            Severity::Info => self.summary.info += 1,
        }

        self.summary.total += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render a short markdown summary
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# Column report (v{})\n\n", self.version));
        out.push_str(&format!(
            "{} queries checked, {} resolved, {} errors, {} warnings\n",
            self.summary.queries_checked,
            self.summary.queries_resolved,
            self.summary.errors,
            self.summary.warnings,
        ));

        if !self.resolved.is_empty() {
            out.push_str("\n## Resolved\n\n| Source | Columns |\n|---|---|\n");
            for query in &self.resolved {
                out.push_str(&format!("| {} | {} |\n", query.source, query.columns.join(", ")));
            }
        }

        if !self.diagnostics.is_empty() {
            out.push_str("\n## Diagnostics\n\n");
            for diag in &self.diagnostics {
                let location = diag
                    .location
                    .as_ref()
                    .map(|l| format!(" ({})", l.file))
                    .unwrap_or_default();
                out.push_str(&format!("- **{}** [{}]{}: {}\n", diag.severity, diag.code, location, diag.message));
            }
        }

        out
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}
