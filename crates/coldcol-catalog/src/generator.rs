//! Column generator for CREATE TABLE
//!
//! Collects DDL column definitions in order. The same definitions render the
//! CREATE TABLE statement and become the registry's column descriptors, so a
//! created table is known to the resolver with exactly the columns it was
//! declared with.

use coldcol_core::{ColumnDescriptor, IdentifierQuoting};

/// One column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,

    /// SQL type as written in the DDL
    pub data_type: String,

    /// Part of the primary key
    pub primary_key: bool,

    /// Accepts NULL
    pub nullable: bool,
}

impl ColumnSpec {
    /// A nullable, non-key column
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            nullable: true,
        }
    }

    fn descriptor(&self) -> ColumnDescriptor {
        let mut column = ColumnDescriptor::new(self.name.clone())
            .with_attribute("type", self.data_type.clone());
        if self.primary_key {
            column = column.with_attribute("primary_key", true);
        }
        if !self.nullable {
            column = column.with_attribute("null", false);
        }
        column
    }

    fn render(&self, quoting: IdentifierQuoting) -> String {
        let mut sql = format!("{} {}", quoting.quote(&self.name), self.data_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        sql
    }
}

/// Ordered set of column definitions for a new table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableGenerator {
    columns: Vec<ColumnSpec>,
}

impl TableGenerator {
    /// Create an empty generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a nullable column
    pub fn column(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        self.columns.push(ColumnSpec::new(name, data_type));
        self
    }

    /// Add a NOT NULL column
    pub fn not_null(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let mut spec = ColumnSpec::new(name, data_type);
        spec.nullable = false;
        self.columns.push(spec);
        self
    }

    /// Add a primary key column
    pub fn primary_key(mut self, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let mut spec = ColumnSpec::new(name, data_type);
        spec.primary_key = true;
        spec.nullable = false;
        self.columns.push(spec);
        self
    }

    /// Add a prepared column definition
    pub fn with_column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Column definitions in declaration order
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Registry descriptors for the declared columns
    pub fn descriptors(&self) -> Vec<ColumnDescriptor> {
        self.columns.iter().map(ColumnSpec::descriptor).collect()
    }

    /// Render `CREATE TABLE` for an already-quoted table literal
    pub fn create_table_sql(&self, table_literal: &str, quoting: IdentifierQuoting) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| c.render(quoting)).collect();
        format!("CREATE TABLE {} ({})", table_literal, columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldcol_core::column_names;

    #[test]
    fn descriptors_follow_declaration_order() {
        let generator = TableGenerator::new()
            .primary_key("id", "integer")
            .column("a", "text")
            .not_null("b", "date");

        let descriptors = generator.descriptors();
        assert_eq!(column_names(&descriptors), vec!["id", "a", "b"]);
        assert_eq!(descriptors[0].attributes["primary_key"], serde_json::Value::Bool(true));
        assert_eq!(descriptors[2].attributes["null"], serde_json::Value::Bool(false));
        assert!(!descriptors[1].attributes.contains_key("null"));
    }

    #[test]
    fn renders_ddl() {
        let generator = TableGenerator::new().primary_key("id", "integer").column("a", "text");

        assert_eq!(
            generator.create_table_sql("\"ddl_table\"", IdentifierQuoting::Double),
            "CREATE TABLE \"ddl_table\" (\"id\" integer PRIMARY KEY, \"a\" text)"
        );
        assert_eq!(
            generator.create_table_sql("ddl_table", IdentifierQuoting::None),
            "CREATE TABLE ddl_table (id integer PRIMARY KEY, a text)"
        );
    }
}
