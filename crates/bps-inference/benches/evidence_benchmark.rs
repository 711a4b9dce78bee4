use bps_core::{Array3, CountMatrix, EvidenceModel, PosteriorRunRecord};
use bps_inference::{CurveDiagnostics, PoissonNmfEvidence, expected_k};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn record(n_sigs: usize, n_samples: usize, n_draws: usize) -> PosteriorRunRecord {
    let n_channels = 96;
    PosteriorRunRecord {
        loadings: Array3::from_fn([n_sigs, n_samples, n_draws], |k, j, s| {
            20.0 + ((k + j + s) % 7) as f64
        }),
        signatures: Array3::from_fn([n_sigs, n_channels, n_draws], |k, i, _| {
            (1 + (i + k) % 5) as f64 / (3.0 * n_channels as f64)
        }),
        expected_loadings: Array3::from_fn([1, n_sigs, n_draws], |_, k, _| k as f64),
        runtime: 0.0,
        hyperparameters: Default::default(),
        counts: None,
    }
}

fn counts(n_samples: usize) -> CountMatrix {
    let mut c = CountMatrix::zeros((0..96).map(|i| i.to_string()).collect(), n_samples);
    for i in 0..96 {
        for j in 0..n_samples {
            c.set(i, j, ((i * 7 + j * 3) % 11) as u64);
        }
    }
    c
}

fn bench_evidence(c: &mut Criterion) {
    let mut group = c.benchmark_group("poisson_nmf_evidence");
    for n_samples in [10usize, 50] {
        let rec = record(8, n_samples, 1000);
        let model = PoissonNmfEvidence::with_counts(counts(n_samples));
        group.bench_with_input(BenchmarkId::from_parameter(n_samples), &rec, |b, rec| {
            b.iter(|| black_box(model.evaluate(rec, 25).unwrap()))
        });
    }
    group.finish();

    let rec = record(20, 1, 2000);
    c.bench_function("expected_k_20x2000", |b| {
        b.iter(|| black_box(expected_k(&rec.expected_loadings, 1.0)))
    });
}

fn bench_diagnostics(c: &mut Criterion) {
    let x: Vec<f64> = (1..=200).map(|i| i as f64 * 0.005).collect();
    let y: Vec<f64> = x.iter().map(|v| (v * 10.0).ln()).collect();
    c.bench_function("curve_diagnostics_200", |b| {
        b.iter(|| black_box(CurveDiagnostics::new("zeta", &x, &y).unwrap()))
    });
}

criterion_group!(benches, bench_evidence, bench_diagnostics);
criterion_main!(benches);
