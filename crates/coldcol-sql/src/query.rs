//! Query tree model
//!
//! A `QueryNode` is one SELECT: its select list, FROM sources, JOIN sources and
//! WITH bindings. Subqueries are owned by their parent; CTE bodies are shared
//! behind an `Arc` because every reference to a CTE name reads the same body.
//!
//! Nodes are built with consuming builder methods. Any structural change
//! clears the node's column memo, so a node never carries columns computed
//! for a different shape.

use coldcol_core::TableName;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// An expression in a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A column reference, optionally qualified by a table or alias
    Column {
        table: Option<TableName>,
        name: String,
    },

    /// A literal value, as written
    Literal(String),

    /// A function call
    Function { name: String, args: Vec<Expr> },

    /// Any other expression, kept as text
    Raw(String),
}

impl Expr {
    /// Column reference from `col` or `table.col` (the last part is the column)
    pub fn column(reference: &str) -> Self {
        let parsed = TableName::parse(reference);
        let mut parts = parsed.parts().to_vec();
        let name = parts.pop().unwrap_or_default();
        let table = (!parts.is_empty()).then(|| TableName::new(parts));
        Self::Column { table, name }
    }

    /// Literal value
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    /// Function call
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Function {
            name: name.into(),
            args,
        }
    }

    /// Select this expression under an alias
    pub fn alias(self, alias: impl Into<String>) -> SelectItem {
        SelectItem::Expr {
            expr: self,
            alias: Some(alias.into()),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column { table: Some(table), name } => write!(f, "{}.{}", table, name),
            Self::Column { table: None, name } => write!(f, "{}", name),
            Self::Literal(text) | Self::Raw(text) => write!(f, "{}", text),
            Self::Function { name, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
        }
    }
}

/// One entry of a SELECT list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectItem {
    /// `*`
    Wildcard,

    /// `table.*`
    TableWildcard(TableName),

    /// An expression with an optional alias
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    /// Unaliased column reference (`col` or `table.col`)
    pub fn column(reference: &str) -> Self {
        Self::Expr {
            expr: Expr::column(reference),
            alias: None,
        }
    }

    /// `table.*`
    pub fn all_of(table: impl Into<TableName>) -> Self {
        Self::TableWildcard(table.into())
    }

    /// Output column name of an expression item
    ///
    /// The alias wins; a bare column reference is named after the column;
    /// anything else has no derivable name. Wildcards never have one.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Expr { alias: Some(alias), .. } => Some(alias),
            Self::Expr { expr: Expr::Column { name, .. }, alias: None } => Some(name),
            _ => None,
        }
    }
}

impl From<Expr> for SelectItem {
    fn from(expr: Expr) -> Self {
        Self::Expr { expr, alias: None }
    }
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wildcard => write!(f, "*"),
            Self::TableWildcard(table) => write!(f, "{}.*", table),
            Self::Expr { expr, alias: Some(alias) } => write!(f, "{} AS {}", expr, alias),
            Self::Expr { expr, alias: None } => write!(f, "{}", expr),
        }
    }
}

/// A FROM or JOIN operand
#[derive(Debug, Clone)]
pub enum Source {
    /// A base table, view or CTE name
    Table(TableName),

    /// A nested query, owned by this position in the tree
    Subquery(Box<QueryNode>),

    /// Either of the above under an alias
    Aliased { source: Box<Source>, alias: String },
}

/// What a source ultimately refers to once aliases are peeled off
#[derive(Debug, Clone, Copy)]
pub enum SourceTarget<'a> {
    Table(&'a TableName),
    Subquery(&'a QueryNode),
}

impl Source {
    /// Table reference
    pub fn table(name: impl Into<TableName>) -> Self {
        Self::Table(name.into())
    }

    /// Subquery
    pub fn subquery(query: QueryNode) -> Self {
        Self::Subquery(Box::new(query))
    }

    /// Wrap this source under an alias
    pub fn alias(self, alias: impl Into<String>) -> Self {
        Self::Aliased {
            source: Box::new(self),
            alias: alias.into(),
        }
    }

    /// The outermost alias, if any
    pub fn alias_name(&self) -> Option<&str> {
        match self {
            Self::Aliased { alias, .. } => Some(alias),
            _ => None,
        }
    }

    /// The table or subquery behind any number of aliases
    pub fn target(&self) -> SourceTarget<'_> {
        match self {
            Self::Table(name) => SourceTarget::Table(name),
            Self::Subquery(query) => SourceTarget::Subquery(query),
            Self::Aliased { source, .. } => source.target(),
        }
    }

    fn references(&self, name: &str) -> bool {
        match self.target() {
            SourceTarget::Table(table) => table.matches_ident(name),
            SourceTarget::Subquery(query) => query.references(name),
        }
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Self::table(name)
    }
}

impl From<QueryNode> for Source {
    fn from(query: QueryNode) -> Self {
        Self::subquery(query)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(name) => write!(f, "{}", name),
            Self::Subquery(query) => write!(f, "({})", query),
            Self::Aliased { source, alias } => write!(f, "{} AS {}", source, alias),
        }
    }
}

/// Join flavour; only used when rendering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keyword = match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
        };
        write!(f, "{}", keyword)
    }
}

/// A JOIN clause; only the right-hand source matters for columns
#[derive(Debug, Clone)]
pub struct Join {
    /// Join flavour
    pub kind: JoinKind,

    /// Right-hand table expression
    pub source: Source,

    /// Join condition as text
    pub on: Option<String>,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.source)?;
        if let Some(on) = &self.on {
            write!(f, " ON {}", on)?;
        }
        Ok(())
    }
}

/// A WITH binding
#[derive(Debug, Clone)]
pub struct CteBinding {
    /// CTE name
    pub name: String,

    /// Bound query, shared by every reference to the name
    pub query: Arc<QueryNode>,
}

/// One SELECT in a query tree
#[derive(Debug, Clone, Default)]
pub struct QueryNode {
    select: Vec<SelectItem>,
    from: Vec<Source>,
    joins: Vec<Join>,
    with: Vec<CteBinding>,

    /// Write-once column memo; also holds externally supplied columns
    columns: OnceLock<Vec<String>>,
}

impl QueryNode {
    /// An empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// `SELECT * FROM name`
    pub fn table(name: impl Into<TableName>) -> Self {
        Self::from_source(Source::table(name))
    }

    /// `SELECT * FROM source`
    pub fn from_source(source: impl Into<Source>) -> Self {
        Self::new().add_from(source)
    }

    fn changed(mut self) -> Self {
        self.columns = OnceLock::new();
        self
    }

    /// Append a FROM source
    pub fn add_from(mut self, source: impl Into<Source>) -> Self {
        self.from.push(source.into());
        self.changed()
    }

    /// Replace the select list
    pub fn select<I>(mut self, items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SelectItem>,
    {
        self.select = items.into_iter().map(Into::into).collect();
        self.changed()
    }

    /// Append to the select list; an empty list first becomes `*`
    pub fn select_append(mut self, item: impl Into<SelectItem>) -> Self {
        if self.select.is_empty() {
            self.select.push(SelectItem::Wildcard);
        }
        self.select.push(item.into());
        self.changed()
    }

    /// Replace the select list with `*`
    pub fn select_all(self) -> Self {
        self.select([SelectItem::Wildcard])
    }

    /// Replace the select list with `table.*`
    pub fn select_all_of(self, table: impl Into<TableName>) -> Self {
        self.select([SelectItem::all_of(table)])
    }

    /// Add an INNER JOIN without a condition
    pub fn join(self, source: impl Into<Source>) -> Self {
        self.join_on(source, JoinKind::Inner, None::<String>)
    }

    /// Add a JOIN clause
    pub fn join_on(mut self, source: impl Into<Source>, kind: JoinKind, on: Option<impl Into<String>>) -> Self {
        self.joins.push(Join {
            kind,
            source: source.into(),
            on: on.map(Into::into),
        });
        self.changed()
    }

    /// Bind a CTE name to a query
    pub fn with_cte(self, name: impl Into<String>, query: QueryNode) -> Result<Self, QueryError> {
        self.with_shared_cte(name, Arc::new(query))
    }

    /// Bind a CTE name to a query that may also be bound elsewhere
    ///
    /// Rejects duplicate names, a body that references its own name, and an
    /// earlier binding of this WITH clause that references the new name.
    pub fn with_shared_cte(mut self, name: impl Into<String>, query: Arc<QueryNode>) -> Result<Self, QueryError> {
        let name = name.into();

        if self.with.iter().any(|b| b.name == name) {
            return Err(QueryError::DuplicateCte(name));
        }
        if query.references(&name) {
            return Err(QueryError::SelfReferentialCte(name));
        }
        if let Some(earlier) = self.with.iter().find(|b| b.query.references(&name)) {
            return Err(QueryError::ForwardCteReference {
                binding: earlier.name.clone(),
                target: name,
            });
        }

        self.with.push(CteBinding { name, query });
        Ok(self.changed())
    }

    /// `SELECT * FROM (self)`
    pub fn from_self(self) -> Self {
        Self::from_source(Source::subquery(self))
    }

    /// `SELECT * FROM (self) AS alias`
    pub fn from_self_as(self, alias: impl Into<String>) -> Self {
        Self::from_source(Source::subquery(self).alias(alias))
    }

    /// Supply the output columns directly, bypassing resolution
    pub fn with_columns<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let node = self.changed();
        let _ = node.columns.set(columns.into_iter().map(Into::into).collect());
        node
    }

    /// Select list in written order; empty means no explicit list
    pub fn select_list(&self) -> &[SelectItem] {
        &self.select
    }

    /// FROM sources in written order
    pub fn from_sources(&self) -> &[Source] {
        &self.from
    }

    /// JOIN clauses in written order
    pub fn join_sources(&self) -> &[Join] {
        &self.joins
    }

    /// WITH bindings in written order
    pub fn cte_bindings(&self) -> &[CteBinding] {
        &self.with
    }

    /// Memoized or externally supplied columns, if any
    pub fn resolved_columns(&self) -> Option<&[String]> {
        self.columns.get().map(Vec::as_slice)
    }

    /// Store resolved columns; the first write wins
    pub(crate) fn memoize(&self, columns: Vec<String>) -> &[String] {
        self.columns.get_or_init(|| columns)
    }

    /// Whether this tree mentions `name` as a table or `name.*`, ignoring
    /// subtrees where a WITH binding of the same name shadows it
    pub fn references(&self, name: &str) -> bool {
        if self.with.iter().any(|b| b.name == name) {
            return false;
        }

        let aliased_here = self
            .from
            .iter()
            .chain(self.joins.iter().map(|j| &j.source))
            .any(|s| s.alias_name() == Some(name));

        self.from.iter().any(|s| s.references(name))
            || self.joins.iter().any(|j| j.source.references(name))
            || self.with.iter().any(|b| b.query.references(name))
            || (!aliased_here
                && self.select.iter().any(|item| matches!(item, SelectItem::TableWildcard(t) if t.matches_ident(name))))
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            let bindings: Vec<String> = self
                .with
                .iter()
                .map(|b| format!("{} AS ({})", b.name, b.query))
                .collect();
            write!(f, "WITH {} ", bindings.join(", "))?;
        }

        if self.select.is_empty() {
            write!(f, "SELECT *")?;
        } else {
            let items: Vec<String> = self.select.iter().map(ToString::to_string).collect();
            write!(f, "SELECT {}", items.join(", "))?;
        }

        if !self.from.is_empty() {
            let sources: Vec<String> = self.from.iter().map(ToString::to_string).collect();
            write!(f, " FROM {}", sources.join(", "))?;
        }

        for join in &self.joins {
            write!(f, " {}", join)?;
        }

        Ok(())
    }
}

/// Errors raised while building a query tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Duplicate CTE name: {0}")]
    DuplicateCte(String),

    #[error("CTE {0} references itself")]
    SelfReferentialCte(String),

    #[error("CTE {binding} references {target}, which is bound after it")]
    ForwardCteReference { binding: String, target: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_like_sql() {
        let query = QueryNode::table("tab1")
            .from_self_as("l")
            .join_on(Source::table("tab2").alias("r"), JoinKind::Left, Some("r.col2 = l.col1"))
            .select_all_of("l")
            .select_append(Expr::column("r.col2"));

        assert_eq!(
            query.to_string(),
            "SELECT l.*, r.col2 FROM (SELECT * FROM tab1) AS l LEFT JOIN tab2 AS r ON r.col2 = l.col1"
        );
    }

    #[test]
    fn renders_ctes_and_functions() {
        let query = QueryNode::table("cte1")
            .select([Expr::function("min", vec![Expr::column("col1")]).alias("mini")])
            .with_cte("cte1", QueryNode::table("tab1"))
            .unwrap();

        assert_eq!(query.to_string(), "WITH cte1 AS (SELECT * FROM tab1) SELECT min(col1) AS mini FROM cte1");
    }

    #[test]
    fn select_append_starts_from_wildcard() {
        let query = QueryNode::table("tab1").select_append(Expr::literal("1").alias("one"));
        assert_eq!(query.select_list()[0], SelectItem::Wildcard);
        assert_eq!(query.select_list().len(), 2);

        let query = QueryNode::table("tab1").select(["a"].map(SelectItem::column)).select_append(SelectItem::column("b"));
        assert_eq!(query.select_list().len(), 2);
    }

    #[test]
    fn output_names() {
        assert_eq!(SelectItem::column("t.col").output_name(), Some("col"));
        assert_eq!(Expr::column("col").alias("renamed").output_name(), Some("renamed"));
        assert_eq!(SelectItem::from(Expr::function("count", vec![])).output_name(), None);
        assert_eq!(SelectItem::Wildcard.output_name(), None);
    }

    #[test]
    fn target_peels_aliases() {
        let source = Source::table("q.tab4").alias("inner").alias("outer");
        assert_eq!(source.alias_name(), Some("outer"));
        assert!(matches!(source.target(), SourceTarget::Table(t) if t.to_string() == "q.tab4"));
    }

    #[test]
    fn cte_validation() {
        let self_ref = QueryNode::new().with_cte("c", QueryNode::table("c"));
        assert_eq!(self_ref.unwrap_err(), QueryError::SelfReferentialCte("c".into()));

        let forward = QueryNode::table("b")
            .with_cte("a", QueryNode::table("b"))
            .and_then(|q| q.with_cte("b", QueryNode::table("tab1")));
        assert!(matches!(forward, Err(QueryError::ForwardCteReference { .. })));

        let duplicate = QueryNode::new()
            .with_cte("a", QueryNode::table("tab1"))
            .and_then(|q| q.with_cte("a", QueryNode::table("tab2")));
        assert_eq!(duplicate.unwrap_err(), QueryError::DuplicateCte("a".into()));

        let backward = QueryNode::table("b")
            .with_cte("a", QueryNode::table("tab1"))
            .and_then(|q| q.with_cte("b", QueryNode::table("a")));
        assert!(backward.is_ok());
    }

    #[test]
    fn shadowed_names_are_not_references() {
        let inner = QueryNode::table("c").with_cte("c", QueryNode::table("tab1")).unwrap();
        assert!(!inner.references("c"));
        assert!(QueryNode::from_self(QueryNode::table("c")).references("c"));
        assert!(!QueryNode::table("tab1").from_self_as("c").select_all_of("c").references("c"));
    }

    #[test]
    fn structural_change_clears_memo() {
        let query = QueryNode::table("tab1").with_columns(["col1"]);
        assert_eq!(query.resolved_columns(), Some(&["col1".to_string()][..]));

        let query = query.select_append(Expr::literal("1").alias("one"));
        assert_eq!(query.resolved_columns(), None);
    }

    #[test]
    fn memo_first_write_wins() {
        let query = QueryNode::table("tab1");
        assert_eq!(query.memoize(vec!["a".into()]), ["a".to_string()]);
        assert_eq!(query.memoize(vec!["b".into()]), ["a".to_string()]);
    }
}
