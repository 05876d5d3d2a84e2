//! Identifiers and their canonical literal rendering
//!
//! Registry keys are compared by the literal form the host query layer would
//! emit, so `q.tab4`, `"q"."tab4"` and `` `q`.`tab4` `` can all name the same
//! table once rendered with the session's quoting style.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How identifiers are quoted when rendered as literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierQuoting {
    /// Identifiers are emitted as-is
    #[default]
    None,

    /// ANSI double quotes: `"tab"`
    Double,

    /// MySQL/BigQuery style backticks: `` `tab` ``
    Backtick,
}

impl IdentifierQuoting {
    /// Quote a single identifier part, doubling embedded quote characters
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Self::None => ident.to_string(),
            Self::Double => format!("\"{}\"", ident.replace('"', "\"\"")),
            Self::Backtick => format!("`{}`", ident.replace('`', "``")),
        }
    }
}

/// A possibly schema-qualified table, view or CTE name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableName {
    parts: Vec<String>,
}

impl TableName {
    /// Build a name from already-split identifier parts
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a dotted name, accepting bare, double-quoted and backticked parts
    ///
    /// Parsing is lenient: an unterminated quote swallows the rest of the input
    /// into the final part.
    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '"' | '`' => {
                    while let Some(inner) = chars.next() {
                        if inner == c {
                            // Doubled quote is an escaped quote character
                            if chars.peek() == Some(&c) {
                                chars.next();
                                current.push(c);
                            } else {
                                break;
                            }
                        } else {
                            current.push(inner);
                        }
                    }
                }
                '.' => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        parts.push(current);

        Self { parts }
    }

    /// Identifier parts, outermost qualifier first
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Whether this is the single, unqualified identifier `ident`
    pub fn matches_ident(&self, ident: &str) -> bool {
        matches!(self.parts.as_slice(), [only] if only == ident)
    }

    /// Render the canonical literal form under the given quoting style
    pub fn literal(&self, quoting: IdentifierQuoting) -> String {
        self.parts
            .iter()
            .map(|part| quoting.quote(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

impl From<&str> for TableName {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl From<String> for TableName {
    fn from(text: String) -> Self {
        Self::parse(&text)
    }
}

impl From<&TableName> for TableName {
    fn from(name: &TableName) -> Self {
        name.clone()
    }
}
