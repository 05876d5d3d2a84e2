//! Column resolution without a database
//!
//! Computes the ordered output column names of a `QueryNode` from the tree
//! itself and a `SchemaRegistry`. Named sources are looked up through a chain
//! of scopes, innermost first, so CTEs bound on an enclosing query are visible
//! to the queries nested under it. Sibling subqueries never see each other's
//! bindings.
//!
//! Successful results are memoized on the node. Failure is all or nothing: a
//! query with any unnamed output column, or none at all, is an error.

use crate::query::{QueryNode, SelectItem, Source, SourceTarget};
use coldcol_catalog::SchemaRegistry;
use coldcol_core::{Diagnostic, DiagnosticCode, Severity, TableName, DEFAULT_MAX_DEPTH};

/// One level of the scope chain
struct Scope<'s> {
    node: &'s QueryNode,
    parent: Option<&'s Scope<'s>>,
    depth: usize,
}

impl<'s> Scope<'s> {
    /// This scope and its ancestors, innermost first
    fn chain(&self) -> impl Iterator<Item = &Scope<'s>> {
        std::iter::successors(Some(self), |scope| scope.parent)
    }
}

/// Resolves query output columns against a registry
///
/// ## Example
///
/// ```rust,ignore
/// let registry = SchemaRegistry::default();
/// registry.add_schema("tab1", columns_from_names(["col1"]));
///
/// let resolver = ColumnResolver::new(&registry);
/// let columns = resolver.columns(&QueryNode::table("tab1"))?;
/// assert_eq!(columns, vec!["col1"]);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'r> {
    registry: &'r SchemaRegistry,
    max_depth: usize,
}

impl<'r> ColumnResolver<'r> {
    /// Create a resolver reading from `registry`
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how many nested scopes one resolution may open
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Output column names of `node`, in order
    pub fn columns(&self, node: &QueryNode) -> Result<Vec<String>, UnresolvableColumnsError> {
        self.resolve(node, None)
    }

    fn resolve(&self, node: &QueryNode, parent: Option<&Scope<'_>>) -> Result<Vec<String>, UnresolvableColumnsError> {
        if let Some(columns) = node.resolved_columns() {
            tracing::trace!(query = %node, "memoized columns");
            return Ok(columns.to_vec());
        }

        let depth = parent.map_or(0, |p| p.depth + 1);
        if depth > self.max_depth {
            return Err(UnresolvableColumnsError::DepthExceeded(self.max_depth));
        }

        let scope = Scope { node, parent, depth };
        let probable = self.probable_columns(&scope)?;

        match probable.into_iter().collect::<Option<Vec<String>>>() {
            Some(columns) if !columns.is_empty() => {
                tracing::trace!(query = %node, ?columns, "resolved columns");
                Ok(node.memoize(columns).to_vec())
            }
            _ => Err(UnresolvableColumnsError::Query(node.to_string())),
        }
    }

    /// Candidate output names; `None` marks a column with no derivable name
    fn probable_columns(&self, scope: &Scope<'_>) -> Result<Vec<Option<String>>, UnresolvableColumnsError> {
        let node = scope.node;
        let items = node.select_list();

        if items.is_empty() {
            let mut columns = Vec::new();
            for source in node.from_sources() {
                columns.extend(self.fetch_columns(source, scope)?.into_iter().map(Some));
            }
            for join in node.join_sources() {
                columns.extend(self.fetch_columns(&join.source, scope)?.into_iter().map(Some));
            }
            return Ok(columns);
        }

        // `*` covers FROM sources only
        let mut star = Vec::new();
        if items.iter().any(|item| matches!(item, SelectItem::Wildcard)) {
            for source in node.from_sources() {
                star.extend(self.fetch_columns(source, scope)?);
            }
        }

        let mut table_star = Vec::new();
        for item in items {
            if let SelectItem::TableWildcard(table) = item {
                table_star.extend(self.resolve_named_source(table, scope)?);
            }
        }

        let explicit = items
            .iter()
            .filter(|item| matches!(item, SelectItem::Expr { .. }))
            .map(|item| item.output_name().map(str::to_string));

        Ok(star
            .into_iter()
            .chain(table_star)
            .map(Some)
            .chain(explicit)
            .collect())
    }

    fn fetch_columns(&self, source: &Source, scope: &Scope<'_>) -> Result<Vec<String>, UnresolvableColumnsError> {
        match source.target() {
            SourceTarget::Subquery(query) => self.resolve(query, Some(scope)),
            SourceTarget::Table(name) => self.resolve_named_source(name, scope),
        }
    }

    /// Columns of a table, alias or CTE name as seen from `scope`
    ///
    /// Tried in order: an aliased FROM entry, CTE bindings up the scope chain,
    /// an aliased JOIN entry, then the registry.
    fn resolve_named_source(&self, name: &TableName, scope: &Scope<'_>) -> Result<Vec<String>, UnresolvableColumnsError> {
        let node = scope.node;

        let aliased_from = node.from_sources().iter().find_map(|source| match source {
            Source::Aliased { source, alias } if name.matches_ident(alias) => Some(source.as_ref()),
            _ => None,
        });
        if let Some(inner) = aliased_from {
            tracing::trace!(%name, "aliased FROM source");
            return match inner.target() {
                SourceTarget::Subquery(query) => self.resolve(query, Some(scope)),
                SourceTarget::Table(table) => self.cte_or_registry(table, scope),
            };
        }

        if let Some(columns) = self.cte_columns(name, scope)? {
            return Ok(columns);
        }

        let aliased_join = node
            .join_sources()
            .iter()
            .find(|join| join.source.alias_name().is_some_and(|alias| name.matches_ident(alias)));
        if let Some(join) = aliased_join {
            tracing::trace!(%name, "aliased JOIN source");
            return match join.source.target() {
                SourceTarget::Subquery(query) => self.resolve(query, Some(scope)),
                SourceTarget::Table(table) => self.registry_columns(table),
            };
        }

        self.registry_columns(name)
    }

    fn cte_or_registry(&self, name: &TableName, scope: &Scope<'_>) -> Result<Vec<String>, UnresolvableColumnsError> {
        match self.cte_columns(name, scope)? {
            Some(columns) => Ok(columns),
            None => self.registry_columns(name),
        }
    }

    /// Columns of the innermost CTE bound to `name`, if any
    fn cte_columns(&self, name: &TableName, scope: &Scope<'_>) -> Result<Option<Vec<String>>, UnresolvableColumnsError> {
        for level in scope.chain() {
            let binding = level
                .node
                .cte_bindings()
                .iter()
                .find(|binding| name.matches_ident(&binding.name));

            if let Some(binding) = binding {
                tracing::trace!(%name, depth = level.depth, "CTE binding");
                return self.resolve(&binding.query, Some(scope)).map(Some);
            }
        }
        Ok(None)
    }

    fn registry_columns(&self, name: &TableName) -> Result<Vec<String>, UnresolvableColumnsError> {
        self.registry
            .find_columns(name)
            .ok_or_else(|| UnresolvableColumnsError::Source(self.registry.literal(name)))
    }
}

/// Column resolution failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnresolvableColumnsError {
    /// A table or alias name that nothing in scope or the registry knows
    #[error("Failed to find columns for {0}")]
    Source(String),

    /// A query whose output columns cannot all be named
    #[error("Failed to find columns for {0}")]
    Query(String),

    /// Raw SQL text, which is never parsed for columns
    #[error("Failed to find columns for raw SQL: {0}")]
    Opaque(String),

    #[error("Failed to find columns: nesting deeper than {0} scopes")]
    DepthExceeded(usize),
}

impl UnresolvableColumnsError {
    /// The source name, query or SQL text that could not be resolved
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Source(subject) | Self::Query(subject) | Self::Opaque(subject) => Some(subject),
            Self::DepthExceeded(_) => None,
        }
    }

    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::new(DiagnosticCode::ColumnsUnresolvable, Severity::Error, self.to_string());
        match self.subject() {
            Some(subject) => diag.with_subject(subject),
            None => diag,
        }
    }
}
