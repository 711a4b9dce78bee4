use bps_core::{Array3, LoadingsMatrix, SignatureSet, expected_rates};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn make_inputs(k: usize, j: usize) -> (LoadingsMatrix, SignatureSet) {
    // Deterministic, strictly positive profiles; no RNG so runs are comparable.
    let rows: Vec<Vec<f64>> =
        (0..k).map(|kk| (0..96).map(|i| 1.0 + ((i * 7 + kk * 13) % 17) as f64).collect()).collect();
    let names = (0..k).map(|kk| format!("Signature {}", kk + 1)).collect();
    let sigs = SignatureSet::from_rows(names, &rows).unwrap();
    let loadings: Vec<Vec<f64>> =
        (0..k).map(|kk| (0..j).map(|jj| ((kk + 1) * (jj % 5 + 1)) as f64 * 10.0).collect()).collect();
    (LoadingsMatrix::from_rows(&loadings).unwrap(), sigs)
}

fn bench_expected_rates(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_expected_rates");

    for j in [10usize, 100, 1000] {
        let (loadings, sigs) = make_inputs(10, j);
        group.bench_with_input(BenchmarkId::new("sigs_t_dot_loadings", j), &j, |b, _| {
            b.iter(|| black_box(expected_rates(&loadings, &sigs).unwrap()))
        });
    }

    group.finish();
}

fn bench_thin(c: &mut Criterion) {
    let mut group = c.benchmark_group("core_array3_thin");

    for draws in [1000usize, 10000] {
        let arr = Array3::from_fn([20, 96, draws], |a, b, c| (a + b + c) as f64);
        group.bench_with_input(BenchmarkId::new("skip_25", draws), &draws, |b, _| {
            b.iter(|| black_box(arr.thin(0, 25).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_expected_rates, bench_thin);
criterion_main!(benches);
