use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_count_logpmfs(c: &mut Criterion) {
    let ks: Vec<u64> = (0..10_000).map(|i| (i % 30) as u64).collect();

    c.bench_function("poisson_logpmf_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &k in &ks {
                acc += bps_prob::poisson::logpmf(k, 3.2).unwrap();
            }
            black_box(acc)
        })
    });

    c.bench_function("negbinom_logpmf_10k", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for &k in &ks {
                acc += bps_prob::neg_binomial::logpmf_r_p(k, 4.0, 0.3).unwrap();
            }
            black_box(acc)
        })
    });
}

fn bench_draws(c: &mut Criterion) {
    c.bench_function("poisson_draw_10k", |b| {
        let mut rng = bps_prob::random_stream(7);
        b.iter(|| {
            let mut acc = 0u64;
            for i in 0..10_000 {
                acc += bps_prob::sampling::poisson(&mut rng, 1.0 + (i % 50) as f64).unwrap();
            }
            black_box(acc)
        })
    });

    let alpha: Vec<f64> = (0..96).map(|i| 0.1 + (i % 7) as f64).collect();
    c.bench_function("dirichlet_96_draw_1k", |b| {
        let mut rng = bps_prob::random_stream(7);
        b.iter(|| {
            for _ in 0..1_000 {
                black_box(bps_prob::sampling::dirichlet(&mut rng, &alpha).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_count_logpmfs, bench_draws);
criterion_main!(benches);
