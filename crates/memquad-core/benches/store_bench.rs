//! Store benchmarks: bulk commit and pattern lookup.

#![allow(clippy::unwrap_used)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use memquad_common::types::{Iri, Quad, Term};
use memquad_core::{MemoryStore, QuadPattern};
use std::hint::black_box;
use std::sync::Arc;

fn generate_quads(count: u64) -> impl Iterator<Item = Quad> {
    (0..count).map(|i| {
        Quad::new(
            Term::iri(format!("http://example.com/subject{}", i % 1_000)),
            Iri::new(format!("http://example.com/predicate{}", i % 10)),
            Term::literal(format!("value {i}")),
        )
    })
}

fn loaded_store(count: u64) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let mut tx = store.begin().unwrap();
    for quad in generate_quads(count) {
        tx.add_statement(&quad, true).unwrap();
    }
    tx.commit().unwrap();
    store
}

fn bench_commit(c: &mut Criterion) {
    c.bench_function("MemoryStore::commit 10k", |b| {
        b.iter_batched(
            || Arc::new(MemoryStore::new()),
            |store| {
                let mut tx = store.begin().unwrap();
                for quad in generate_quads(10_000) {
                    tx.add_statement(&quad, true).unwrap();
                }
                black_box(tx.commit().unwrap())
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_pattern_lookup(c: &mut Criterion) {
    let store = loaded_store(50_000);
    let by_subject = QuadPattern::any().with_subject(Term::iri("http://example.com/subject42"));
    let by_predicate_and_subject = QuadPattern::any()
        .with_subject(Term::iri("http://example.com/subject42"))
        .with_predicate(Term::iri("http://example.com/predicate2"));

    c.bench_function("MemoryStore::statements subject", |b| {
        b.iter(|| black_box(store.statements(&by_subject).count()));
    });
    c.bench_function("MemoryStore::statements subject+predicate", |b| {
        b.iter(|| black_box(store.statements(&by_predicate_and_subject).count()));
    });
}

criterion_group!(benches, bench_commit, bench_pattern_lookup);
criterion_main!(benches);
