//! Benchmarks for predicate composition, SQL rendering and in-memory execution

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use squad_query::{
    MemoryEngine, QueryFactory, TableRef,
    compose::{all_of, when},
    path::{NumberPath, StringPath},
    sql::DatabaseType,
};

struct Condition {
    username: Option<&'static str>,
    age_goe: Option<i64>,
    age_loe: Option<i64>,
    team_name: Option<&'static str>,
}

fn compose(condition: &Condition) -> Option<squad_query::Filter> {
    let username = StringPath::new("member", "username");
    let age = NumberPath::new("member", "age");
    let team_name = StringPath::new("team", "name");
    all_of([
        when(condition.username, |v| username.equals(v)),
        when(condition.age_goe, |v| age.gte(v)),
        when(condition.age_loe, |v| age.lte(v)),
        when(condition.team_name, |v| team_name.equals(v)),
    ])
}

// ============================================================================
// Composition Benchmarks
// ============================================================================

fn bench_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("composition");

    let cases = [
        (
            "all_absent",
            Condition {
                username: None,
                age_goe: None,
                age_loe: None,
                team_name: None,
            },
        ),
        (
            "one_present",
            Condition {
                username: Some("member1"),
                age_goe: None,
                age_loe: None,
                team_name: None,
            },
        ),
        (
            "all_present",
            Condition {
                username: Some("member4"),
                age_goe: Some(35),
                age_loe: Some(40),
                team_name: Some("teamB"),
            },
        ),
    ];

    for (name, condition) in &cases {
        group.bench_with_input(BenchmarkId::new("all_of", name), condition, |b, condition| {
            b.iter(|| black_box(compose(condition)))
        });
    }

    group.finish();
}

// ============================================================================
// SQL Rendering Benchmarks
// ============================================================================

fn bench_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("rendering");

    let filter = compose(&Condition {
        username: Some("member4"),
        age_goe: Some(35),
        age_loe: Some(40),
        team_name: Some("teamB"),
    })
    .unwrap_or_default();

    for dialect in [DatabaseType::PostgreSQL, DatabaseType::MySQL] {
        group.bench_with_input(
            BenchmarkId::new("filter_to_sql", format!("{:?}", dialect)),
            &dialect,
            |b, dialect| b.iter(|| black_box(filter.to_sql(*dialect))),
        );
    }

    group.finish();
}

// ============================================================================
// Execution Benchmarks
// ============================================================================

fn seeded(rows: i64) -> MemoryEngine {
    let engine = MemoryEngine::new();
    engine
        .register_table("member", &["id", "username", "age"])
        .expect("register member");
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let query = QueryFactory::new(engine.clone());
    runtime.block_on(async {
        for i in 0..rows {
            query
                .insert(&Member)
                .value("username", format!("member{}", i))
                .value("age", i % 60)
                .exec()
                .await
                .expect("insert");
        }
    });
    engine
}

struct Member;

impl squad_query::EntityPath for Member {
    fn table(&self) -> &str {
        "member"
    }

    fn alias(&self) -> &str {
        "member"
    }

    fn columns(&self) -> &[&'static str] {
        &["id", "username", "age"]
    }
}

fn bench_execution(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_select");
    let runtime = tokio::runtime::Runtime::new().expect("runtime");

    for rows in [100i64, 1_000] {
        let query = QueryFactory::new(seeded(rows));
        let filter = compose(&Condition {
            username: None,
            age_goe: Some(35),
            age_loe: Some(40),
            team_name: None,
        });

        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::new("filtered", rows), &rows, |b, _| {
            b.to_async(&runtime).iter(|| {
                let op = query
                    .select_from(&Member)
                    .r#where(filter.clone())
                    .order_by(NumberPath::new("member", "age").desc());
                async move { black_box(op.fetch().await) }
            })
        });
    }

    group.bench_function("table_ref_qualify", |b| {
        let table = TableRef::new("member", "member1");
        b.iter(|| black_box(table.qualify("age")))
    });

    group.finish();
}

criterion_group!(benches, bench_composition, bench_rendering, bench_execution);

criterion_main!(benches);
