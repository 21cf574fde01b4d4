use criterion::{criterion_group, criterion_main, Criterion};

use judyarray::Judy;

fn keys() -> Vec<Vec<u8>> {
    (0..10_000u32)
        .map(|idx| format!("{:08x}/{idx}", idx.wrapping_mul(0x9e37_79b9)).into_bytes())
        .collect()
}

fn bulk_insert(c: &mut Criterion) {
    let keys = keys();
    c.bench_function("insert 10k keys", |b| {
        b.iter(|| {
            let mut judy = Judy::open(32).unwrap();
            for key in &keys {
                *judy.cell(key).unwrap() += 1;
            }
            judy.memory()
        })
    });
}

fn ordered_walk(c: &mut Criterion) {
    let keys = keys();
    let mut judy = Judy::open(32).unwrap();
    for key in &keys {
        *judy.cell(key).unwrap() += 1;
    }
    c.bench_function("walk 10k keys", |b| {
        b.iter(|| {
            let mut total = 0u64;
            let mut cell = judy.strt(b"").map(|cell| *cell);
            while let Some(count) = cell {
                total += count;
                cell = judy.nxt().map(|cell| *cell);
            }
            total
        })
    });
}

criterion_group!(benches, bulk_insert, ordered_walk);
criterion_main!(benches);
