//! Benchmarking the serial number read path, which any thread may hit at any time.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use owl_socinfo::{SerialCache, soc_serial_high, soc_serial_low};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("serial_accessors");

    // Nothing is published in a benchmark process, so this measures the unset path. The set
    // path is one more pointer load and should not be meaningfully different.
    group.bench_function("soc_serial_low", |b| {
        b.iter(|| black_box(soc_serial_low()));
    });

    group.bench_function("soc_serial_high", |b| {
        b.iter(|| black_box(soc_serial_high()));
    });

    group.bench_function("halves", |b| {
        let cache = SerialCache::global();
        b.iter(|| black_box(cache.halves()));
    });

    group.finish();
}
