use circllhist::Histogram;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;
use rand_distr::{Distribution, Pareto};

fn make_points(size: usize, seed: u64) -> Vec<f64> {
    // Latency-like samples in microseconds: most of the mass near 15ms, with a long tail out to 10 seconds.
    let distribution = Pareto::new(1.0, 1.0).expect("pareto distribution should be valid");
    let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
    distribution
        .sample_iter(&mut rng)
        .map(|n| n * 10_000.0)
        .filter(|n| *n > 15_000.0 && *n < 10_000_000.0)
        .take(size)
        .collect::<Vec<_>>()
}

fn insert_single_and_serialize(ns: &[f64]) -> Vec<u8> {
    let mut histogram = Histogram::new();
    for n in ns {
        histogram.insert(*n).expect("points should encode");
    }
    histogram.serialize()
}

fn insert_many_and_serialize(ns: &[f64]) -> Vec<u8> {
    let mut histogram = Histogram::new();
    histogram.insert_many(ns).expect("points should encode");
    histogram.serialize()
}

fn bench_insert(c: &mut Criterion) {
    let sizes = [1, 10, 100, 1_000, 10_000];
    let seed = 0xC0FFEE;

    let mut group = c.benchmark_group("Histogram/insert-single");
    for size in sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let vals = make_points(size, seed);
            b.iter(|| insert_single_and_serialize(&vals));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("Histogram/insert-many");
    for size in sizes.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let vals = make_points(size, seed);
            b.iter(|| insert_many_and_serialize(&vals));
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("Histogram/merge");
    for sources in [2usize, 10, 100] {
        let histograms = (0..sources as u64)
            .map(|seed| {
                let mut histogram = Histogram::new();
                histogram.insert_many(&make_points(1_000, seed)).expect("points should encode");
                histogram
            })
            .collect::<Vec<_>>();

        group.throughput(Throughput::Elements(sources as u64));
        group.bench_with_input(BenchmarkId::new("pairwise", sources), &histograms, |b, histograms| {
            let mut aggregate = Histogram::new();
            b.iter(|| {
                aggregate.clear();
                for histogram in histograms {
                    aggregate.merge(histogram);
                }
                aggregate.sample_count()
            });
        });

        let refs = histograms.iter().collect::<Vec<_>>();
        group.bench_with_input(BenchmarkId::new("accumulate", sources), &refs, |b, refs| {
            let mut aggregate = Histogram::new();
            b.iter(|| {
                aggregate.clear();
                aggregate.accumulate(refs);
                aggregate.sample_count()
            });
        });
    }
    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("Histogram/from-text");
    for size in [10usize, 1_000, 100_000] {
        let mut histogram = Histogram::new();
        histogram.insert_many(&make_points(size, 0xC0FFEE)).expect("points should encode");
        let text = histogram.to_text();

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| Histogram::from_text(text).expect("text should decode"));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_merge, bench_deserialize);
criterion_main!(benches);
