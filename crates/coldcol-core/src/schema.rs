//! Column descriptors shared by the registry and its producers

use serde::{Deserialize, Serialize};

/// Opaque per-column attributes (types, constraints, defaults)
///
/// The resolver never looks inside; callers that need more than names do.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A column known to exist on a table or view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Declared attributes
    #[serde(default)]
    pub attributes: Attributes,
}

impl ColumnDescriptor {
    /// Create a column with no attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Set attributes
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Set a single attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Project descriptors down to their names, preserving order
pub fn column_names(columns: &[ColumnDescriptor]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

/// Build descriptors from bare names
pub fn columns_from_names<I, S>(names: I) -> Vec<ColumnDescriptor>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(ColumnDescriptor::new).collect()
}
