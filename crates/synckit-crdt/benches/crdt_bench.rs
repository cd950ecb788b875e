use criterion::{criterion_group, criterion_main, Criterion};

use synckit_core::{ClientId, LogicalTimestamp, Value};
use synckit_crdt::{LwwDocument, OrSet, TextCrdt};

fn bench_lww_set_field(c: &mut Criterion) {
    let mut doc = LwwDocument::new();
    let mut counter = 0u64;
    c.bench_function("lww_document_set_field", |b| {
        b.iter(|| {
            counter += 1;
            let delta = doc.local_set("field", Value::from(counter as i64), LogicalTimestamp::new(counter, ClientId::from("bench")));
            doc.apply(&delta)
        })
    });
}

fn bench_text_append(c: &mut Criterion) {
    c.bench_function("text_crdt_append_1000_chars", |b| {
        b.iter(|| {
            let mut doc = TextCrdt::new();
            for i in 0..1000u64 {
                let delta = doc.local_insert(doc.visible_len(), "x", LogicalTimestamp::new(i + 1, ClientId::from("bench")));
                doc.apply(&delta);
            }
            doc
        })
    });
}

fn bench_or_set_add(c: &mut Criterion) {
    let mut set: OrSet<u64> = OrSet::new();
    let mut counter = 0u64;
    c.bench_function("or_set_add", |b| {
        b.iter(|| {
            counter += 1;
            let delta = set.local_add(counter, LogicalTimestamp::new(counter, ClientId::from("bench")));
            set.apply(&delta)
        })
    });
}

criterion_group!(benches, bench_lww_set_field, bench_text_append, bench_or_set_add);
criterion_main!(benches);
