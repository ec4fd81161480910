use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;
use tempfile::TempDir;

use eventspan::{ColumnDesc, EventCollection, QueryDesc, StoreEventsRequest};

const BATCH_SIZES: &[usize] = &[16, 256];
const QUERY_EVENT_COUNT: usize = 4096;

fn build_request(tag: &str, offset_us: i64, count: usize) -> StoreEventsRequest {
    let events = (0..count)
        .map(|i| {
            let us = offset_us + i as i64;
            json!({
                "_ts": format!("1970-01-01T00:00:00.{:06}Z", us % 1_000_000),
                "_hash": format!("{us:x}"),
                "host": format!("h{}", i % 8),
                "bytes": i,
            })
        })
        .collect();
    serde_json::from_value(json!({ "tag": tag, "events": events })).expect("request")
}

fn bench_store_events(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_events");
    for &size in BATCH_SIZES {
        group.bench_function(format!("batch_{size}"), |b| {
            let tmp = TempDir::new().expect("temp dir");
            let collection = EventCollection::create(tmp.path().join("events")).expect("create");
            let mut offset = 0i64;
            b.iter_batched(
                || {
                    let request = build_request("bench", offset, size);
                    offset += size as i64;
                    request
                },
                |request| collection.store_events(request).expect("store"),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let tmp = TempDir::new().expect("temp dir");
    let collection = EventCollection::create(tmp.path().join("events")).expect("create");
    collection
        .store_events(build_request("bench", 0, QUERY_EVENT_COUNT))
        .expect("seed");

    let mut group = c.benchmark_group("query");
    group.bench_function("raw_scan", |b| {
        b.iter(|| collection.query(QueryDesc::default()).expect("query"));
    });
    group.bench_function("grouped_sum", |b| {
        let desc = QueryDesc {
            columns: vec![ColumnDesc {
                name: "bytes".into(),
                aggregate: "sum".into(),
            }],
            group_by: vec!["host".into()],
            point_size: 1_000,
            ..QueryDesc::default()
        };
        b.iter(|| collection.query(desc.clone()).expect("query"));
    });
    group.finish();
}

criterion_group!(benches, bench_store_events, bench_query);
criterion_main!(benches);
