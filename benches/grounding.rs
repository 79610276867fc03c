use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wingman::catalog::CatalogField;
use wingman::grouping::group;
use wingman::prompt::{ContextBudget, build_prompt};
use wingman::search::{SearchHit, similarity_score};

fn ranked_hits(count: usize) -> Vec<SearchHit> {
    (0..count)
        .map(|i| {
            let metadata = CatalogField {
                database_name: format!("db_{}", i % 4),
                database_description: "Operational warehouse".to_string(),
                table_name: format!("table_{}", i % 9),
                table_description: "Transactional records".to_string(),
                field_name: format!("field_{}", i),
                business_name: format!("Field {}", i),
                business_description: "Identifier used to join customer facing records".to_string(),
                data_type: "VARCHAR".to_string(),
                length: Some(64),
                tags: vec!["pii".to_string(), "key".to_string()],
                sample_values: Vec::new(),
            };
            let distance = i as f32 * 0.05;
            SearchHit {
                rank: i + 1,
                distance,
                text: metadata.embedding_text(),
                metadata,
                similarity_score: similarity_score(distance),
            }
        })
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let hits = ranked_hits(25);
    let budget = ContextBudget::default();

    c.bench_function("group", |b| b.iter(|| group(black_box(&hits))));
    c.bench_function("build_prompt", |b| {
        b.iter(|| build_prompt(black_box("who is the customer"), black_box(&hits), budget))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
