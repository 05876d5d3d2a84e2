//! Benchmarks for column resolution
//!
//! Measures cold resolution of deeply nested queries and wide joins, and the
//! cost of reading back memoized columns.

use coldcol_catalog::SchemaRegistry;
use coldcol_core::columns_from_names;
use coldcol_sql::{ColumnResolver, QueryNode, SelectItem, Session, Source};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Registry with `num_tables` tables of `num_columns` columns each
fn generate_registry(num_tables: usize, num_columns: usize) -> SchemaRegistry {
    let registry = SchemaRegistry::default();
    for t in 0..num_tables {
        let columns = (0..num_columns).map(|c| format!("t{}_col_{}", t, c));
        registry.add_schema(format!("table_{}", t).as_str(), columns_from_names(columns));
    }
    registry
}

/// `table_0` wrapped in `depth` levels of subqueries
fn generate_nested(depth: usize) -> QueryNode {
    let mut query = QueryNode::table("table_0");
    for level in 0..depth {
        query = query.from_self_as(format!("s{}", level));
    }
    query
}

/// A chain of `depth` CTEs, each selecting from the previous one
fn generate_cte_chain(depth: usize) -> QueryNode {
    let mut query = QueryNode::table(format!("cte_{}", depth - 1).as_str());
    for i in 0..depth {
        let body = if i == 0 {
            QueryNode::table("table_0")
        } else {
            QueryNode::table(format!("cte_{}", i - 1).as_str())
        };
        query = query.with_cte(format!("cte_{}", i), body).expect("CTE chain binds backwards only");
    }
    query
}

/// `table_0` joined with `num_joins` aliased tables, selecting every alias
fn generate_wide_join(num_joins: usize) -> QueryNode {
    let mut query = QueryNode::from_source(Source::table("table_0").alias("t0"));
    for i in 1..=num_joins {
        query = query.join(Source::table(format!("table_{}", i).as_str()).alias(format!("t{}", i)));
    }
    query.select((0..=num_joins).map(|i| SelectItem::all_of(format!("t{}", i).as_str())))
}

/// Benchmark: cold resolution through nested subqueries
fn bench_nested_subqueries(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_subqueries");
    let registry = generate_registry(1, 20);

    for depth in [10, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let resolver = ColumnResolver::new(&registry);
            b.iter(|| {
                let query = generate_nested(depth);
                black_box(resolver.columns(&query))
            });
        });
    }

    group.finish();
}

/// Benchmark: cold resolution through CTE chains
fn bench_cte_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("cte_chain");
    let registry = generate_registry(1, 20);

    for depth in [10, 50].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(depth), depth, |b, &depth| {
            let resolver = ColumnResolver::new(&registry);
            b.iter(|| {
                let query = generate_cte_chain(depth);
                black_box(resolver.columns(&query))
            });
        });
    }

    group.finish();
}

/// Benchmark: table wildcards over many aliased joins
fn bench_wide_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_join");

    for num_joins in [5, 20, 50].iter() {
        let registry = generate_registry(num_joins + 1, 10);

        group.bench_with_input(BenchmarkId::from_parameter(num_joins), num_joins, |b, &num_joins| {
            let resolver = ColumnResolver::new(&registry);
            b.iter(|| {
                let query = generate_wide_join(num_joins);
                black_box(resolver.columns(&query))
            });
        });
    }

    group.finish();
}

/// Benchmark: reading back memoized columns
fn bench_memoized(c: &mut Criterion) {
    let mut group = c.benchmark_group("memoized");
    let registry = generate_registry(1, 20);
    let resolver = ColumnResolver::new(&registry);

    let warm = generate_nested(100);
    let _ = resolver.columns(&warm);

    group.bench_function("warm", |b| {
        b.iter(|| black_box(resolver.columns(&warm)));
    });

    group.finish();
}

/// Benchmark: parse, lower and resolve SQL text
fn bench_sql_end_to_end(c: &mut Criterion) {
    let session = Session::default();
    session.add_table_schema("tab1", columns_from_names(["col1", "col2", "col3"]));
    session.add_table_schema("tab2", columns_from_names(["col4", "col5"]));

    let sql = "WITH a AS (SELECT * FROM tab1), b AS (SELECT col4 FROM tab2) \
               SELECT a.*, b.col4 AS renamed FROM a JOIN b ON a.col1 = b.col4";

    c.bench_function("sql_end_to_end", |b| {
        b.iter(|| black_box(session.columns_for_sql(sql)));
    });
}

criterion_group!(
    benches,
    bench_nested_subqueries,
    bench_cte_chain,
    bench_wide_join,
    bench_memoized,
    bench_sql_end_to_end
);

criterion_main!(benches);
