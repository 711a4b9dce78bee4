use bps_core::{CorruptionModel, Dispersion, LoadingsMatrix, SignatureSet, SubstitutionType};
use bps_synth::NoiseModelGenerator;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn generator(n_signatures: usize, n_samples: usize) -> NoiseModelGenerator {
    let n_channels = SubstitutionType::Sbs.n_channels();
    let rows: Vec<Vec<f64>> = (0..n_signatures)
        .map(|k| (0..n_channels).map(|i| 1.0 + ((i * (k + 3)) % 11) as f64).collect())
        .collect();
    let names = (0..n_signatures).map(|k| format!("SBS{}", k + 1)).collect();
    let sigs = SignatureSet::from_rows(names, &rows).unwrap();
    let loadings: Vec<Vec<f64>> = (0..n_signatures)
        .map(|k| (0..n_samples).map(|j| 50.0 + ((j + k) % 9) as f64 * 40.0).collect())
        .collect();
    NoiseModelGenerator::new(LoadingsMatrix::from_rows(&loadings).unwrap(), sigs)
        .unwrap()
        .with_channel_labels(SubstitutionType::Sbs.channel_labels())
        .unwrap()
}

fn bench_variants(c: &mut Criterion) {
    let g = generator(10, 200);
    let models = [
        CorruptionModel::Exact,
        CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(0.0025) },
        CorruptionModel::NegativeBinomial { dispersion: 2.0 },
        CorruptionModel::Contamination { percent: 2.0 },
    ];

    let mut group = c.benchmark_group("generate_10x200");
    for model in &models {
        group.bench_with_input(BenchmarkId::from_parameter(model), model, |b, m| {
            b.iter(|| black_box(g.generate(m, 1).unwrap()))
        });
    }
    group.finish();
}

fn bench_sample_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_exact_scaling");
    for n_samples in [50usize, 500, 2000] {
        let g = generator(10, n_samples);
        group.bench_with_input(BenchmarkId::from_parameter(n_samples), &g, |b, g| {
            b.iter(|| black_box(g.generate(&CorruptionModel::Exact, 1).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_variants, bench_sample_scaling);
criterion_main!(benches);
