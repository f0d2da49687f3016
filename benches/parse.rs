//! Row parsing benchmarks for rsparser
//!
//! These benchmarks measure the row walk over flat scalar streams and
//! over multi-row collection expansions, the two shapes that dominate
//! real result sets.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rsparser::schema::{PropertyDef, RecordTypeCatalog, RecordTypeDef};
use rsparser::{Parser, SourceValue};
use std::sync::Arc;

fn catalog() -> Arc<RecordTypeCatalog> {
    Arc::new(
        RecordTypeCatalog::builder()
            .record_type(RecordTypeDef::new(
                "Person",
                vec![
                    PropertyDef::number("id").id(),
                    PropertyDef::string("firstName"),
                    PropertyDef::string("lastName"),
                    PropertyDef::number("scores").array(),
                ],
            ))
            .build()
            .expect("benchmark schema is valid"),
    )
}

fn bench_flat_rows(c: &mut Criterion) {
    let catalog = catalog();
    let rows: Vec<Vec<SourceValue>> = (0..1_000i64)
        .map(|i| {
            vec![
                SourceValue::Int(i),
                SourceValue::Text(format!("First{}", i)),
                SourceValue::Text(format!("Last{}", i)),
            ]
        })
        .collect();

    c.bench_function("flat_scalars_1k_rows", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Arc::clone(&catalog), "Person").unwrap();
            parser.init(&["id", "firstName", "lastName"]).unwrap();
            for row in &rows {
                parser.feed_row(black_box(row)).unwrap();
            }
            black_box(parser.records().len())
        });
    });
}

fn bench_collection_coalescing(c: &mut Criterion) {
    let catalog = catalog();
    // 100 persons x 10 score rows each.
    let rows: Vec<Vec<SourceValue>> = (0..1_000i64)
        .map(|i| {
            vec![
                SourceValue::Int(i / 10),
                SourceValue::Text("First".to_string()),
                SourceValue::Text("Last".to_string()),
                SourceValue::Int(1),
                SourceValue::Float((i % 10) as f64),
            ]
        })
        .collect();

    c.bench_function("scalar_array_coalescing_1k_rows", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Arc::clone(&catalog), "Person").unwrap();
            parser
                .init(&["id", "firstName", "lastName", "scores", "a$"])
                .unwrap();
            for row in &rows {
                parser.feed_row(black_box(row)).unwrap();
            }
            black_box(parser.records().len())
        });
    });
}

criterion_group!(benches, bench_flat_rows, bench_collection_coalescing);
criterion_main!(benches);
