//! Schema registry: known column lists for tables and views
//!
//! Three provenance tiers are kept apart and consulted in a fixed order:
//! views created during the session, then tables created during the session,
//! then declared schemas (schema files and manual declarations). The first
//! tier holding a match wins; tiers are never merged for one name.

use coldcol_core::{column_names, ColumnDescriptor, IdentifierQuoting, TableName};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

type TierMap = BTreeMap<String, Vec<ColumnDescriptor>>;

/// Provenance tier of a registry entry, highest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// View created during the session
    SessionView,

    /// Table created during the session
    SessionTable,

    /// Declared via schema file or manual declaration
    Declared,
}

impl Tier {
    /// All tiers in lookup order
    pub const PRECEDENCE: [Tier; 3] = [Tier::SessionView, Tier::SessionTable, Tier::Declared];
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionView => write!(f, "session view"),
            Self::SessionTable => write!(f, "session table"),
            Self::Declared => write!(f, "declared schema"),
        }
    }
}

#[derive(Debug, Default)]
struct Tiers {
    views: TierMap,
    tables: TierMap,
    schemas: TierMap,
}

impl Tiers {
    fn get(&self, tier: Tier) -> &TierMap {
        match tier {
            Tier::SessionView => &self.views,
            Tier::SessionTable => &self.tables,
            Tier::Declared => &self.schemas,
        }
    }

    fn get_mut(&mut self, tier: Tier) -> &mut TierMap {
        match tier {
            Tier::SessionView => &mut self.views,
            Tier::SessionTable => &mut self.tables,
            Tier::Declared => &mut self.schemas,
        }
    }
}

/// Columns found for a name, with the tier that supplied them
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryMatch {
    /// Tier the columns came from
    pub tier: Tier,

    /// Key the columns were stored under
    pub key: String,

    /// Stored column descriptors, in order
    pub columns: Vec<ColumnDescriptor>,
}

/// Shared, internally synchronized schema registry
///
/// Owned by a session handle and lent to resolvers. Every read and write runs
/// under one mutex, so a registry can be shared across threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Quoting used to build canonical literal names
    quoting: IdentifierQuoting,

    tiers: Mutex<Tiers>,
}

impl SchemaRegistry {
    /// Create an empty registry rendering literals with `quoting`
    pub fn new(quoting: IdentifierQuoting) -> Self {
        Self {
            quoting,
            tiers: Mutex::new(Tiers::default()),
        }
    }

    /// Quoting style used for canonical literal names
    pub fn quoting(&self) -> IdentifierQuoting {
        self.quoting
    }

    /// Canonical literal form of `name` for this registry
    pub fn literal(&self, name: &TableName) -> String {
        name.literal(self.quoting)
    }

    fn lock(&self) -> MutexGuard<'_, Tiers> {
        // Every write is a single insert or extend; a poisoned map is still consistent
        self.tiers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, tier: Tier, key: String, columns: Vec<ColumnDescriptor>) {
        tracing::debug!(%tier, key = %key, columns = columns.len(), "registering columns");
        self.lock().get_mut(tier).insert(key, columns);
    }

    /// Declare the columns of `name`, replacing any earlier declaration
    ///
    /// The key is the bare textual form of the name.
    pub fn add_schema(&self, name: impl Into<TableName>, columns: Vec<ColumnDescriptor>) {
        let name = name.into();
        self.insert(Tier::Declared, name.to_string(), columns);
    }

    /// Record a table created during the session under its literal name
    pub fn add_created_table(&self, literal_name: impl Into<String>, columns: Vec<ColumnDescriptor>) {
        self.insert(Tier::SessionTable, literal_name.into(), columns);
    }

    /// Record a view created during the session under its literal name
    pub fn add_created_view(&self, literal_name: impl Into<String>, columns: Vec<ColumnDescriptor>) {
        self.insert(Tier::SessionView, literal_name.into(), columns);
    }

    /// Merge externally loaded declarations into the declared tier
    ///
    /// Entries with a key already present are replaced; all other existing
    /// declarations are kept.
    pub fn merge_schemas<I>(&self, schemas: I)
    where
        I: IntoIterator<Item = (String, Vec<ColumnDescriptor>)>,
    {
        let mut tiers = self.lock();
        let declared = tiers.get_mut(Tier::Declared);
        let before = declared.len();
        declared.extend(schemas);
        tracing::debug!(added = declared.len() - before, total = declared.len(), "merged declared schemas");
    }

    /// Look up the stored descriptors for `name`
    ///
    /// Each tier is tried in precedence order with the canonical literal form,
    /// then the bare textual form, then a scan for any key that re-renders to
    /// the canonical literal. Returns `None` when no tier matches.
    pub fn find(&self, name: &TableName) -> Option<RegistryMatch> {
        let literal = self.literal(name);
        let bare = name.to_string();
        let tiers = self.lock();

        for tier in Tier::PRECEDENCE {
            let map = tiers.get(tier);

            let found = map
                .get_key_value(literal.as_str())
                .or_else(|| map.get_key_value(bare.as_str()))
                .or_else(|| {
                    map.iter()
                        .find(|(key, _)| TableName::parse(key).literal(self.quoting) == literal)
                });

            if let Some((key, columns)) = found {
                tracing::trace!(name = %literal, %tier, key = %key, "registry hit");
                return Some(RegistryMatch {
                    tier,
                    key: key.clone(),
                    columns: columns.clone(),
                });
            }
        }

        tracing::trace!(name = %literal, "registry miss");
        None
    }

    /// Column names for `name`, or `None` when no tier knows it
    pub fn find_columns(&self, name: &TableName) -> Option<Vec<String>> {
        self.find(name).map(|m| column_names(&m.columns))
    }

    /// Number of entries stored in a tier
    pub fn tier_len(&self, tier: Tier) -> usize {
        self.lock().get(tier).len()
    }

    /// Keys stored in a tier, sorted
    pub fn keys(&self, tier: Tier) -> Vec<String> {
        self.lock().get(tier).keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldcol_core::columns_from_names;

    #[test]
    fn views_shadow_tables_shadow_declared() {
        let registry = SchemaRegistry::default();
        registry.add_schema("dup", columns_from_names(["schema_col"]));
        registry.add_created_table("dup", columns_from_names(["table_col"]));
        registry.add_created_view("dup", columns_from_names(["view_col"]));

        let found = registry.find(&TableName::parse("dup")).unwrap();
        assert_eq!(found.tier, Tier::SessionView);
        assert_eq!(column_names(&found.columns), vec!["view_col"]);
    }

    #[test]
    fn tables_shadow_declared() {
        let registry = SchemaRegistry::default();
        registry.add_schema("priority_test", columns_from_names(["schema_col"]));
        registry.add_created_table("priority_test", columns_from_names(["created_col"]));

        assert_eq!(
            registry.find_columns(&TableName::parse("priority_test")),
            Some(vec!["created_col".to_string()])
        );
    }

    #[test]
    fn reregistering_replaces() {
        let registry = SchemaRegistry::default();
        registry.add_schema("t", columns_from_names(["a", "b"]));
        registry.add_schema("t", columns_from_names(["c"]));

        assert_eq!(registry.find_columns(&"t".into()), Some(vec!["c".to_string()]));
        assert_eq!(registry.tier_len(Tier::Declared), 1);
    }

    #[test]
    fn missing_is_none_but_empty_is_found() {
        let registry = SchemaRegistry::default();
        registry.add_schema("empty", Vec::new());

        assert_eq!(registry.find_columns(&"nope".into()), None);
        assert_eq!(registry.find_columns(&"empty".into()), Some(Vec::new()));
    }

    #[test]
    fn literal_key_found_first() {
        let registry = SchemaRegistry::new(IdentifierQuoting::Double);
        registry.add_created_table("\"q\".\"tab4\"", columns_from_names(["col5"]));

        let found = registry.find(&TableName::parse("q.tab4")).unwrap();
        assert_eq!(found.key, "\"q\".\"tab4\"");
    }

    #[test]
    fn bare_key_found_under_quoting() {
        let registry = SchemaRegistry::new(IdentifierQuoting::Double);
        registry.add_schema("users", columns_from_names(["id"]));

        assert_eq!(registry.find_columns(&"users".into()), Some(vec!["id".to_string()]));
    }

    #[test]
    fn heterogeneous_key_found_by_scan() {
        // Key spelled with backticks, registry renders without quoting
        let registry = SchemaRegistry::new(IdentifierQuoting::None);
        registry.add_created_view("`q`.`tab4`", columns_from_names(["col5"]));

        let found = registry.find(&TableName::parse("q.tab4")).unwrap();
        assert_eq!(found.key, "`q`.`tab4`");
        assert_eq!(found.tier, Tier::SessionView);
    }

    #[test]
    fn merge_keeps_prior_entries() {
        let registry = SchemaRegistry::default();
        registry.merge_schemas(vec![("initial_table".to_string(), columns_from_names(["col_x"]))]);
        registry.merge_schemas(vec![("second_table".to_string(), columns_from_names(["col_y"]))]);

        assert_eq!(registry.keys(Tier::Declared), vec!["initial_table", "second_table"]);
        assert_eq!(registry.find_columns(&"initial_table".into()), Some(vec!["col_x".to_string()]));
    }
}
