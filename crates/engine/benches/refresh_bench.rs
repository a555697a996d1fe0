//! Benchmarks for live query refresh.
//!
//! Each iteration changes one record field, which dispatches a batch and
//! recomputes every live query over the source.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quiver_core::{FieldMap, Record, Result, Value};
use quiver_engine::Engine;
use quiver_query::ast::{BinaryOp, Node, OrderSpec, PathComponent, PathRoot};
use quiver_query::{ParsedQuery, ParserFactory, PathCollector, QueryParser};
use std::rc::Rc;

/// `age > 50 order by age`
struct OlderThanFifty;

impl QueryParser for OlderThanFifty {
    fn parse(&mut self, _: &str, paths: &mut PathCollector) -> Result<ParsedQuery> {
        let age = || vec![PathComponent::Key(Value::from("age"))];
        let filter = paths.path_node(PathRoot::Local, age());
        let order = paths.path(PathRoot::Local, age());
        Ok(ParsedQuery::all()
            .with_filter(Node::binary(BinaryOp::Gt, filter, Node::literal(50)))
            .with_order(vec![OrderSpec::asc(order)], false))
    }
}

fn engine() -> Engine {
    let factory: ParserFactory = Rc::new(|| -> Box<dyn QueryParser> { Box::new(OlderThanFifty) });
    match Engine::builder().parser(factory).build() {
        Ok(engine) => engine,
        Err(err) => panic!("engine failed to build: {}", err),
    }
}

fn people(engine: &Engine, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| engine.record(FieldMap::from_pairs([("age", Value::from((i * 37) % 100))])))
        .collect()
}

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("live_refresh");

    for size in [100, 1_000, 10_000] {
        let engine = engine();
        let records = people(&engine, size);
        let source = engine.collection(records.iter().cloned().map(Value::from).collect());
        let live = match engine.dynamic(&source, "older", &[]) {
            Ok(live) => live,
            Err(err) => panic!("live query failed: {}", err),
        };
        let target = &records[size / 2];
        let mut age = 0;

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                age = (age + 1) % 100;
                if let Err(err) = target.set("age", age) {
                    panic!("refresh failed: {}", err);
                }
                black_box(live.len())
            })
        });
    }
    group.finish();
}

fn bench_chained(c: &mut Criterion) {
    let engine = engine();
    let records = people(&engine, 1_000);
    let source = engine.collection(records.iter().cloned().map(Value::from).collect());
    let first = engine.dynamic(&source, "older", &[]).ok();
    let second = first.as_ref().and_then(|first| engine.dynamic(first, "older", &[]).ok());
    let target = &records[500];
    let mut age = 0;

    c.bench_function("chained_refresh_1000", |b| {
        b.iter(|| {
            age = (age + 1) % 100;
            if let Err(err) = target.set("age", age) {
                panic!("chained refresh failed: {}", err);
            }
            black_box(second.as_ref().map(|s| s.len()))
        })
    });
}

criterion_group!(benches, bench_refresh, bench_chained);
criterion_main!(benches);
