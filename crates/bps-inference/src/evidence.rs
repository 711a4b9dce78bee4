//! Evidence for Poisson-NMF posterior runs.
//!
//! Each thinned draw `s` gives a log-likelihood
//! `ℓ_s = Σ_ij log Poisson(X_ij | Σ_k S[k,i,s] · L[k,j,s])`. The log marginal
//! likelihood is the harmonic-mean estimate `−log mean_s exp(−ℓ_s)`.

use bps_core::{
    Array3, CountMatrix, Error, EvidenceEstimate, EvidenceModel, PosteriorRunRecord, Result,
};
use bps_prob::{math, poisson};

/// Activity cutoff (mutations) above which a signature counts towards `K`.
pub const ACTIVITY_CUTOFF: f64 = 1.0;

/// Poisson-NMF likelihood scored against observed counts.
///
/// Counts stored in a run record take precedence over the default counts.
#[derive(Debug, Clone, Default)]
pub struct PoissonNmfEvidence {
    counts: Option<CountMatrix>,
}

impl PoissonNmfEvidence {
    /// Model with no default counts; every record must carry its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// Model scoring records against `counts` unless they carry their own.
    pub fn with_counts(counts: CountMatrix) -> Self {
        Self { counts: Some(counts) }
    }

    /// Per-draw log-likelihoods after keeping every `skip`-th draw.
    pub fn log_likelihoods(&self, record: &PosteriorRunRecord, skip: usize) -> Result<Vec<f64>> {
        let counts = record.counts.as_ref().or(self.counts.as_ref()).ok_or_else(|| {
            Error::Configuration("no observed counts available for evidence evaluation".to_string())
        })?;
        let loadings = record.loadings.thin(0, skip)?;
        let signatures = record.signatures.thin(0, skip)?;
        let [n_sigs, n_channels, n_draws] = signatures.shape();
        let [_, n_samples, _] = loadings.shape();

        if n_channels != counts.n_channels() || n_samples != counts.n_samples() {
            return Err(Error::Validation(format!(
                "posterior is {n_channels} channels × {n_samples} samples but counts are {} × {}",
                counts.n_channels(),
                counts.n_samples()
            )));
        }
        if n_draws == 0 {
            return Err(Error::Validation("no posterior draws left after thinning".to_string()));
        }

        (0..n_draws)
            .map(|s| {
                let mut ll = 0.0;
                for i in 0..n_channels {
                    for j in 0..n_samples {
                        let rate: f64 = (0..n_sigs)
                            .map(|k| signatures.get(k, i, s) * loadings.get(k, j, s))
                            .sum();
                        ll += poisson::logpmf(counts.get(i, j), rate)?;
                    }
                }
                Ok(ll)
            })
            .collect()
    }
}

impl EvidenceModel for PoissonNmfEvidence {
    fn evaluate(&self, record: &PosteriorRunRecord, skip: usize) -> Result<EvidenceEstimate> {
        let ll = self.log_likelihoods(record, skip)?;
        let neg: Vec<f64> = ll.iter().map(|x| -x).collect();
        Ok(EvidenceEstimate {
            log_evidence: -math::log_mean_exp(&neg),
            std_error: math::std_dev(&ll) / (ll.len() as f64).sqrt(),
            expected_log_likelihood: math::mean(&ll),
            n_draws: ll.len(),
        })
    }

    fn name(&self) -> &str {
        "PoissonNMF"
    }
}

/// Number of signatures whose posterior-median expected loading exceeds `cutoff`.
///
/// `expected_loadings` is `R × K × S`; the median for signature `k` is taken
/// over every replicate and draw.
pub fn expected_k(expected_loadings: &Array3, cutoff: f64) -> usize {
    let [n_rep, n_sigs, _] = expected_loadings.shape();
    (0..n_sigs)
        .filter(|&k| {
            let values: Vec<f64> =
                (0..n_rep).flat_map(|r| expected_loadings.lane(r, k).iter().copied()).collect();
            math::median(&values) > cutoff
        })
        .count()
}
