//! Benchmarks for alignment and expression evaluation
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use plantdb::align::{SeriesColumn, WideTable};
use plantdb::expression::{evaluate, Expression};
use plantdb::storage::*;
use tempfile::tempdir;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

/// 15-minute series; `offset` shifts it so columns only partially overlap
fn create_column(name: &str, count: usize, offset: i64) -> SeriesColumn {
    SeriesColumn {
        name: name.to_string(),
        points: (0..count as i64)
            .map(|i| (base() + Duration::minutes(15 * (i + offset)), Some(i as f64)))
            .collect(),
    }
}

fn bench_outer_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("outer_join");

    for size in [1_000, 35_040] {
        for width in [2, 8] {
            let columns: Vec<SeriesColumn> = (0..width)
                .map(|i| create_column(&format!("m_{}", i), size, i as i64 * 7))
                .collect();

            group.throughput(Throughput::Elements((size * width) as u64));
            group.bench_function(format!("align_{}x{}", width, size), |b| {
                b.iter(|| WideTable::align(black_box(columns.clone())))
            });
        }
    }

    group.finish();
}

fn bench_expression(c: &mut Criterion) {
    let mut group = c.benchmark_group("expression");
    let table = WideTable::align([
        create_column("m_0", 35_040, 0),
        create_column("m_1", 35_040, 3),
        create_column("m_2", 35_040, 5),
    ]);

    group.throughput(Throughput::Elements(table.len() as u64));

    group.bench_function("parse", |b| {
        b.iter(|| Expression::parse(black_box("(m_0 - m_1) * 0.5 + m_2 / 4")).unwrap())
    });

    let compiled = Expression::parse("(m_0 - m_1) * 0.5 + m_2 / 4").unwrap();
    group.bench_function("evaluate_year", |b| {
        b.iter(|| compiled.evaluate(black_box(&table)).unwrap())
    });

    group.bench_function("parse_and_evaluate_year", |b| {
        b.iter(|| evaluate(black_box("m_0 + m_1 + m_2"), &table).unwrap())
    });

    group.finish();
}

fn bench_store_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("store");
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path().join("bench.db")).unwrap();
    db.ensure_schema().unwrap();

    let catalog = MetadataCatalog::new(db.clone());
    let store = MeasurementStore::new(db);
    let descriptor = Descriptor::new("BENCH", "ISTWERT", "obj", "2023-01-01", "2023-12-31", RasterSpec::default());
    catalog.insert(&descriptor).unwrap();

    let records: Vec<NewRecord> = (0..35_040i64)
        .map(|i| NewRecord::new(base() + Duration::minutes(15 * i), i as f64))
        .collect();
    store.append(&descriptor.series_id, &records).unwrap();

    let start = DateBound::parse("2023-03-01").unwrap();
    let end = DateBound::parse("2023-04-01").unwrap();

    group.bench_function("query_month", |b| {
        b.iter(|| {
            store
                .query(black_box(&descriptor.series_id), Some(&start), Some(&end))
                .unwrap()
        })
    });

    group.bench_function("query_year", |b| {
        b.iter(|| store.query(black_box(&descriptor.series_id), None, None).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_outer_join, bench_expression, bench_store_query);
criterion_main!(benches);
