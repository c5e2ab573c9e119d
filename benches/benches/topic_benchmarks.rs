use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use zrelay::{matches, TopicFilter};

fn bench_matches(c: &mut Criterion) {
    let frame = b"topic:hello world".to_vec();
    c.bench_function("matches hit", |b| {
        b.iter(|| matches(black_box(b"topic:"), black_box(&frame)))
    });
    c.bench_function("matches miss", |b| {
        b.iter(|| matches(black_box(b"other:"), black_box(&frame)))
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("TopicFilter::matches");
    let frame = b"topic:hello world".to_vec();

    for n in [1usize, 8, 64] {
        // Совпадает только последний префикс.
        let mut prefixes: Vec<String> = (0..n - 1).map(|i| format!("miss{i}:")).collect();
        prefixes.push("topic:".into());
        let filter = TopicFilter::with_prefixes(&prefixes);

        group.bench_with_input(BenchmarkId::from_parameter(n), &filter, |b, filter| {
            b.iter(|| filter.matches(black_box(&frame)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_matches, bench_filter);
criterion_main!(benches);
