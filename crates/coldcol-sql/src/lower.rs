//! Lowering parsed SQL into query trees
//!
//! Only the parts of a SELECT that shape its output columns are kept: the
//! projection, FROM and JOIN operands, and WITH bindings. Filters, grouping
//! and ordering are dropped. A set operation takes its columns from its left
//! operand.
//!
//! A projection of exactly `*` lowers to an empty select list, so JOIN
//! operands contribute their columns as they do in SQL.
//!
//! CREATE TABLE and CREATE VIEW lower to `Command`s that a session applies
//! to its registry.

use crate::query::{Expr, JoinKind, QueryError, QueryNode, SelectItem, Source};
use coldcol_catalog::{ColumnSpec, TableGenerator};
use coldcol_core::{Diagnostic, DiagnosticCode, Severity, TableName};
use sqlparser::ast::{
    self, ColumnDef, ColumnOption, FunctionArg, FunctionArgExpr, FunctionArguments, JoinConstraint, JoinOperator,
    ObjectName, SetExpr, Statement, TableAlias, TableFactor, WildcardAdditionalOptions,
};

/// A statement a session can apply
#[derive(Debug, Clone)]
pub enum Command {
    /// A query whose columns are wanted
    Query(QueryNode),

    /// CREATE TABLE with column definitions
    CreateTable { name: TableName, generator: TableGenerator },

    /// CREATE TABLE ... AS
    CreateTableAs { name: TableName, query: QueryNode },

    /// CREATE VIEW ... AS
    CreateView { name: TableName, query: QueryNode },
}

/// Lower a statement; only queries are accepted
pub fn lower_statement(statement: &Statement) -> Result<QueryNode, LowerError> {
    match statement {
        Statement::Query(query) => lower_query(query),
        other => Err(LowerError::UnsupportedStatement(first_keyword(&other.to_string()))),
    }
}

/// Lower a query or a CREATE TABLE / CREATE VIEW statement
pub fn lower_command(statement: &Statement) -> Result<Command, LowerError> {
    match statement {
        Statement::Query(query) => Ok(Command::Query(lower_query(query)?)),
        Statement::CreateTable(create) => {
            let name = table_name(&create.name);
            match &create.query {
                Some(query) => Ok(Command::CreateTableAs {
                    name,
                    query: lower_query(query)?,
                }),
                None => Ok(Command::CreateTable {
                    name,
                    generator: create
                        .columns
                        .iter()
                        .map(column_spec)
                        .fold(TableGenerator::new(), TableGenerator::with_column),
                }),
            }
        }
        Statement::CreateView { name, columns, query, .. } => {
            let mut node = lower_query(query)?;
            // `CREATE VIEW v (a, b) AS ...` names the columns outright
            if !columns.is_empty() {
                node = node.with_columns(columns.iter().map(|c| c.name.value.clone()));
            }
            Ok(Command::CreateView {
                name: table_name(name),
                query: node,
            })
        }
        other => Err(LowerError::UnsupportedStatement(first_keyword(&other.to_string()))),
    }
}

fn column_spec(def: &ColumnDef) -> ColumnSpec {
    let mut spec = ColumnSpec::new(def.name.value.clone(), def.data_type.to_string());
    for option in &def.options {
        match option.option {
            ColumnOption::NotNull => spec.nullable = false,
            ColumnOption::Unique { is_primary: true, .. } => {
                spec.primary_key = true;
                spec.nullable = false;
            }
            _ => {}
        }
    }
    spec
}

/// Lower a query with its WITH clause
pub fn lower_query(query: &ast::Query) -> Result<QueryNode, LowerError> {
    let mut node = lower_set_expr(&query.body)?;

    if let Some(with) = &query.with {
        if with.recursive {
            return Err(LowerError::Unsupported("WITH RECURSIVE".to_string()));
        }

        for cte in &with.cte_tables {
            if !cte.alias.columns.is_empty() {
                return Err(LowerError::Unsupported(format!("column list on CTE {}", cte.alias.name.value)));
            }
            node = node.with_cte(cte.alias.name.value.clone(), lower_query(&cte.query)?)?;
        }
    }

    Ok(node)
}

fn lower_set_expr(body: &SetExpr) -> Result<QueryNode, LowerError> {
    match body {
        SetExpr::Select(select) => lower_select(select),
        SetExpr::Query(query) => lower_query(query),
        SetExpr::SetOperation { left, .. } => lower_set_expr(left),
        other => Err(LowerError::Unsupported(first_keyword(&other.to_string()))),
    }
}

fn lower_select(select: &ast::Select) -> Result<QueryNode, LowerError> {
    let mut node = QueryNode::new();

    for table in &select.from {
        node = node.add_from(lower_table_factor(&table.relation)?);

        for join in &table.joins {
            let (kind, constraint) = join_kind(&join.join_operator)?;
            node = node.join_on(lower_table_factor(&join.relation)?, kind, constraint.and_then(join_condition));
        }
    }

    let items = select
        .projection
        .iter()
        .map(lower_select_item)
        .collect::<Result<Vec<_>, _>>()?;

    if let [SelectItem::Wildcard] = items.as_slice() {
        return Ok(node);
    }
    Ok(node.select(items))
}

fn lower_select_item(item: &ast::SelectItem) -> Result<SelectItem, LowerError> {
    match item {
        ast::SelectItem::UnnamedExpr(expr) => Ok(SelectItem::from(lower_expr(expr))),
        ast::SelectItem::ExprWithAlias { expr, alias } => Ok(lower_expr(expr).alias(alias.value.clone())),
        ast::SelectItem::Wildcard(options) => {
            plain_wildcard(options)?;
            Ok(SelectItem::Wildcard)
        }
        ast::SelectItem::QualifiedWildcard(name, options) => {
            plain_wildcard(options)?;
            Ok(SelectItem::TableWildcard(table_name(name)))
        }
    }
}

/// Wildcard modifiers change the column set, so they are refused
fn plain_wildcard(options: &WildcardAdditionalOptions) -> Result<(), LowerError> {
    let modifier = if options.opt_ilike.is_some() {
        Some("ILIKE")
    } else if options.opt_exclude.is_some() {
        Some("EXCLUDE")
    } else if options.opt_except.is_some() {
        Some("EXCEPT")
    } else if options.opt_replace.is_some() {
        Some("REPLACE")
    } else if options.opt_rename.is_some() {
        Some("RENAME")
    } else {
        None
    };

    match modifier {
        Some(modifier) => Err(LowerError::Unsupported(format!("wildcard {}", modifier))),
        None => Ok(()),
    }
}

fn lower_expr(expr: &ast::Expr) -> Expr {
    match expr {
        ast::Expr::Identifier(ident) => Expr::Column {
            table: None,
            name: ident.value.clone(),
        },
        ast::Expr::CompoundIdentifier(idents) => match idents.split_last() {
            Some((name, qualifier)) => Expr::Column {
                table: (!qualifier.is_empty()).then(|| TableName::new(qualifier.iter().map(|i| i.value.clone()))),
                name: name.value.clone(),
            },
            None => Expr::Raw(expr.to_string()),
        },
        ast::Expr::Function(function) => {
            let args = match &function.args {
                FunctionArguments::None => Vec::new(),
                FunctionArguments::Subquery(query) => vec![Expr::Raw(query.to_string())],
                FunctionArguments::List(list) => list
                    .args
                    .iter()
                    .map(|arg| match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => lower_expr(expr),
                        other => Expr::Raw(other.to_string()),
                    })
                    .collect(),
            };
            Expr::function(function.name.to_string(), args)
        }
        ast::Expr::Value(value) => Expr::Literal(value.to_string()),
        other => Expr::Raw(other.to_string()),
    }
}

fn lower_table_factor(factor: &TableFactor) -> Result<Source, LowerError> {
    match factor {
        TableFactor::Table { name, alias, .. } => aliased(Source::Table(table_name(name)), alias.as_ref()),
        TableFactor::Derived { subquery, alias, .. } => aliased(Source::subquery(lower_query(subquery)?), alias.as_ref()),
        other => Err(LowerError::Unsupported(format!("table expression {}", other))),
    }
}

fn aliased(source: Source, alias: Option<&TableAlias>) -> Result<Source, LowerError> {
    match alias {
        None => Ok(source),
        Some(alias) if alias.columns.is_empty() => Ok(source.alias(alias.name.value.clone())),
        Some(alias) => Err(LowerError::Unsupported(format!("column list on alias {}", alias.name.value))),
    }
}

fn join_kind(operator: &JoinOperator) -> Result<(JoinKind, Option<&JoinConstraint>), LowerError> {
    match operator {
        JoinOperator::Inner(constraint) => Ok((JoinKind::Inner, Some(constraint))),
        JoinOperator::LeftOuter(constraint) => Ok((JoinKind::Left, Some(constraint))),
        JoinOperator::RightOuter(constraint) => Ok((JoinKind::Right, Some(constraint))),
        JoinOperator::FullOuter(constraint) => Ok((JoinKind::Full, Some(constraint))),
        JoinOperator::CrossJoin => Ok((JoinKind::Cross, None)),
        other => Err(LowerError::Unsupported(format!("join operator {:?}", other))),
    }
}

fn join_condition(constraint: &JoinConstraint) -> Option<String> {
    match constraint {
        JoinConstraint::On(expr) => Some(expr.to_string()),
        _ => None,
    }
}

fn table_name(name: &ObjectName) -> TableName {
    TableName::new(name.0.iter().map(|ident| ident.value.clone()))
}

fn first_keyword(sql: &str) -> String {
    sql.split_whitespace().next().unwrap_or_default().to_uppercase()
}

/// Errors raised while lowering SQL
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LowerError {
    #[error("Only queries have columns, found a {0} statement")]
    UnsupportedStatement(String),

    #[error("Unsupported SQL construct: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Query(#[from] QueryError),
}

impl LowerError {
    /// Convert to a diagnostic
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::SqlUnsupportedSyntax, Severity::Error, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SqlParser;
    use pretty_assertions::assert_eq;

    fn lower(sql: &str) -> Result<QueryNode, LowerError> {
        let parsed = SqlParser::new().parse(sql, None).unwrap();
        lower_statement(parsed.first_statement().unwrap())
    }

    #[test]
    fn bare_star_becomes_empty_select() {
        let node = lower("SELECT * FROM tab1 JOIN tab2 ON tab1.col1 = tab2.col2").unwrap();
        assert!(node.select_list().is_empty());
        assert_eq!(node.join_sources().len(), 1);
        assert_eq!(node.join_sources()[0].on.as_deref(), Some("tab1.col1 = tab2.col2"));
    }

    #[test]
    fn projection_items() {
        let node = lower("SELECT t.*, col1, t.col2, count(*) AS n, 1 FROM tab1 AS t").unwrap();
        let names: Vec<Option<&str>> = node.select_list().iter().map(SelectItem::output_name).collect();

        assert_eq!(names, vec![None, Some("col1"), Some("col2"), Some("n"), None]);
        assert_eq!(node.select_list()[0], SelectItem::all_of("t"));
        assert_eq!(node.from_sources()[0].alias_name(), Some("t"));
    }

    #[test]
    fn ctes_and_subqueries() {
        let node = lower("WITH c AS (SELECT col1 FROM tab1) SELECT * FROM (SELECT * FROM c) AS s").unwrap();
        assert_eq!(node.cte_bindings()[0].name, "c");
        assert_eq!(node.to_string(), "WITH c AS (SELECT col1 FROM tab1) SELECT * FROM (SELECT * FROM c) AS s");
    }

    #[test]
    fn qualified_tables() {
        let node = lower("SELECT * FROM q.tab4").unwrap();
        assert_eq!(node.from_sources()[0].to_string(), "q.tab4");
    }

    #[test]
    fn union_uses_left_operand() {
        let node = lower("SELECT col1 FROM tab1 UNION ALL SELECT col2 FROM tab2").unwrap();
        assert_eq!(node.to_string(), "SELECT col1 FROM tab1");
    }

    #[test]
    fn rejects_unsupported() {
        assert_eq!(
            lower("INSERT INTO tab1 VALUES (1)").unwrap_err(),
            LowerError::UnsupportedStatement("INSERT".into())
        );
        assert!(matches!(
            lower("WITH RECURSIVE r AS (SELECT 1 AS n) SELECT * FROM r"),
            Err(LowerError::Unsupported(_))
        ));
        assert!(matches!(
            lower("WITH c (x) AS (SELECT 1) SELECT * FROM c"),
            Err(LowerError::Unsupported(_))
        ));
        assert!(matches!(
            lower("WITH c AS (SELECT * FROM c) SELECT * FROM c"),
            Err(LowerError::Query(QueryError::SelfReferentialCte(_)))
        ));
    }

    fn command(sql: &str) -> Command {
        let parsed = SqlParser::new().parse(sql, None).unwrap();
        lower_command(parsed.first_statement().unwrap()).unwrap()
    }

    #[test]
    fn create_table_columns() {
        let Command::CreateTable { name, generator } =
            command("CREATE TABLE s.events (id INT PRIMARY KEY, kind TEXT NOT NULL, note TEXT)")
        else {
            panic!("expected CREATE TABLE");
        };

        assert_eq!(name, TableName::new(["s", "events"]));
        let specs = generator.columns();
        assert_eq!(specs.len(), 3);
        assert!(specs[0].primary_key);
        assert!(!specs[1].nullable);
        assert!(specs[2].nullable);
        assert_eq!(specs[1].data_type, "TEXT");
    }

    #[test]
    fn create_table_as_and_view() {
        assert!(matches!(
            command("CREATE TABLE t AS SELECT col1 FROM tab1"),
            Command::CreateTableAs { .. }
        ));

        let Command::CreateView { query, .. } = command("CREATE VIEW v (a, b) AS SELECT * FROM tab3") else {
            panic!("expected CREATE VIEW");
        };
        assert_eq!(query.resolved_columns(), Some(&["a".to_string(), "b".to_string()][..]));
    }

    fn lower_with(parser: SqlParser, sql: &str) -> Result<QueryNode, LowerError> {
        let parsed = parser.parse(sql, None).unwrap();
        lower_statement(parsed.first_statement().unwrap())
    }

    #[test]
    fn wildcard_modifiers_rejected() {
        let cases = [
            (SqlParser::bigquery(), "SELECT * EXCEPT (col3) FROM tab3", "wildcard EXCEPT"),
            (SqlParser::bigquery(), "SELECT t.* EXCEPT (col3) FROM tab3 AS t", "wildcard EXCEPT"),
            (SqlParser::bigquery(), "SELECT * REPLACE (col3 + 1 AS col3) FROM tab3", "wildcard REPLACE"),
            (SqlParser::snowflake(), "SELECT * EXCLUDE (col3) FROM tab3", "wildcard EXCLUDE"),
            (SqlParser::snowflake(), "SELECT * RENAME (col3 AS x) FROM tab3", "wildcard RENAME"),
            (SqlParser::snowflake(), "SELECT * ILIKE '%3' FROM tab3", "wildcard ILIKE"),
        ];

        for (parser, sql, construct) in cases {
            assert_eq!(lower_with(parser, sql).unwrap_err(), LowerError::Unsupported(construct.into()), "{}", sql);
        }
    }

    #[test]
    fn modified_wildcard_among_other_items() {
        assert!(matches!(
            lower_with(SqlParser::bigquery(), "SELECT 1 AS one, * EXCEPT (col3) FROM tab3"),
            Err(LowerError::Unsupported(_))
        ));
        assert!(lower_with(SqlParser::bigquery(), "SELECT 1 AS one, * FROM tab3").is_ok());
    }

    #[test]
    fn diagnostic_code() {
        let err = lower("DELETE FROM tab1").unwrap_err();
        assert_eq!(err.to_diagnostic().code, DiagnosticCode::SqlUnsupportedSyntax);
    }
}
