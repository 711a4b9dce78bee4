//! Synthetic count generation under the corruption models.
//!
//! All variants start from the rate matrix `Sᵗ·L` (`I × J`) and draw counts
//! sample by sample (outer loop over samples `j`, inner loop over channels
//! `i`) from one owned random stream seeded per call.

use bps_core::{
    CorruptionModel, CountMatrix, Dispersion, Error, LoadingsMatrix, Result, SignatureSet,
    expected_rates,
};
use bps_prob::sampling;
use nalgebra::DMatrix;
use rand::Rng;

/// Intercept of the fitted `log(mean_error / sparsity)` vs `log κ` relation.
pub const MEAN_ERROR_INTERCEPT: f64 = 3.6641;
/// Slope of the fitted `log(mean_error / sparsity)` vs `log κ` relation.
pub const MEAN_ERROR_SLOPE: f64 = 0.9820;
/// Dirichlet concentration per channel of the contamination signature.
pub const CONTAMINATION_CONCENTRATION: f64 = 1.0;

/// Sparsity of a profile: `1 / (I · ‖s‖²)`; 1 for a uniform profile.
pub fn signature_sparsity(profile: &[f64]) -> f64 {
    let sq: f64 = profile.iter().map(|v| v * v).sum();
    1.0 / (profile.len() as f64 * sq)
}

/// Dirichlet concentration giving an expected perturbation error of `mean_error`.
///
/// Inverts `log(mean_error / sparsity) = 3.6641 − 0.9820 · log κ`.
pub fn concentration_for_mean_error(mean_error: f64, profile: &[f64]) -> Result<f64> {
    if !mean_error.is_finite() || mean_error <= 0.0 {
        return Err(Error::Configuration(format!(
            "target mean error must be finite and > 0, got {mean_error}"
        )));
    }
    let sparsity = signature_sparsity(profile);
    let log_kappa = (MEAN_ERROR_INTERCEPT - (mean_error / sparsity).ln()) / MEAN_ERROR_SLOPE;
    Ok(log_kappa.exp())
}

/// Loading vector of one sample with `fraction` of its total moved onto an
/// appended error signature: `[(1 − f)·l, f·Σl]`.
pub fn contaminated_loadings(loading: &[f64], fraction: f64) -> Vec<f64> {
    let total: f64 = loading.iter().sum();
    let mut out: Vec<f64> = loading.iter().map(|l| (1.0 - fraction) * l).collect();
    out.push(fraction * total);
    out
}

/// Generates synthetic count matrices from fixed ground truth.
#[derive(Debug, Clone)]
pub struct NoiseModelGenerator {
    loadings: LoadingsMatrix,
    signatures: SignatureSet,
    rates: DMatrix<f64>,
    channels: Vec<String>,
}

impl NoiseModelGenerator {
    /// Pair loadings (`K × J`) with signatures (`K × I`).
    ///
    /// A different `K` between the two is a configuration error.
    pub fn new(loadings: LoadingsMatrix, signatures: SignatureSet) -> Result<Self> {
        let rates = expected_rates(&loadings, &signatures)?;
        let channels = (0..signatures.n_channels()).map(|i| i.to_string()).collect();
        Ok(Self { loadings, signatures, rates, channels })
    }

    /// Label output rows with channel names instead of positions.
    pub fn with_channel_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if labels.len() != self.signatures.n_channels() {
            return Err(Error::Configuration(format!(
                "{} channel labels supplied for {} channels",
                labels.len(),
                self.signatures.n_channels()
            )));
        }
        self.channels = labels;
        Ok(self)
    }

    /// Ground-truth loadings.
    pub fn loadings(&self) -> &LoadingsMatrix {
        &self.loadings
    }

    /// Ground-truth signatures.
    pub fn signatures(&self) -> &SignatureSet {
        &self.signatures
    }

    /// Expected counts `Sᵗ·L` (`I × J`).
    pub fn rates(&self) -> &DMatrix<f64> {
        &self.rates
    }

    /// Generate counts for `model` from the stream seeded with `seed`.
    pub fn generate(&self, model: &CorruptionModel, seed: u64) -> Result<CountMatrix> {
        model.validate()?;
        let mut rng = bps_prob::random_stream(seed);
        self.generate_with(model, &mut rng)
    }

    /// Generate counts for `model` drawing from a caller-owned stream.
    pub fn generate_with<R: Rng + ?Sized>(
        &self,
        model: &CorruptionModel,
        rng: &mut R,
    ) -> Result<CountMatrix> {
        model.validate()?;
        match *model {
            CorruptionModel::Exact => self.exact(rng),
            CorruptionModel::Overdispersed { dispersion } => {
                let kappas = self.concentrations(dispersion)?;
                if kappas.iter().all(|k| k.is_infinite()) {
                    return self.exact(rng);
                }
                self.overdispersed(&kappas, rng)
            }
            CorruptionModel::NegativeBinomial { dispersion } if dispersion == 1.0 => self.exact(rng),
            CorruptionModel::NegativeBinomial { dispersion } => {
                self.negative_binomial(dispersion, rng)
            }
            CorruptionModel::Contamination { percent } => self.contamination(percent / 100.0, rng),
        }
    }

    /// Per-signature Dirichlet concentrations for an overdispersed model.
    pub fn concentrations(&self, dispersion: Dispersion) -> Result<Vec<f64>> {
        let k = self.signatures.n_signatures();
        match dispersion {
            Dispersion::Concentration(kappa) => Ok(vec![kappa; k]),
            Dispersion::MeanError(err) => (0..k)
                .map(|kk| concentration_for_mean_error(err, &self.signatures.profile(kk)))
                .collect(),
        }
    }

    fn empty_counts(&self) -> CountMatrix {
        CountMatrix::zeros(self.channels.clone(), self.loadings.n_samples())
    }

    fn exact<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CountMatrix> {
        let mut counts = self.empty_counts();
        for j in 0..self.loadings.n_samples() {
            for i in 0..self.signatures.n_channels() {
                counts.set(i, j, sampling::poisson(rng, self.rates[(i, j)])?);
            }
        }
        Ok(counts)
    }

    fn overdispersed<R: Rng + ?Sized>(&self, kappas: &[f64], rng: &mut R) -> Result<CountMatrix> {
        let n_channels = self.signatures.n_channels();
        let mut counts = self.empty_counts();
        let mut rate = vec![0.0; n_channels];

        for j in 0..self.loadings.n_samples() {
            rate.iter_mut().for_each(|r| *r = 0.0);
            for (k, &kappa) in kappas.iter().enumerate() {
                let profile = self.signatures.profile(k);
                let perturbed = if kappa.is_infinite() {
                    profile
                } else {
                    let alpha: Vec<f64> = profile.iter().map(|s| kappa * s).collect();
                    sampling::dirichlet(rng, &alpha)?
                };
                let weight = self.loadings.matrix()[(k, j)];
                for (r, s) in rate.iter_mut().zip(&perturbed) {
                    *r += weight * s;
                }
            }
            for (i, &lambda) in rate.iter().enumerate() {
                counts.set(i, j, sampling::poisson(rng, lambda)?);
            }
        }
        Ok(counts)
    }

    fn negative_binomial<R: Rng + ?Sized>(
        &self,
        overdispersion: f64,
        rng: &mut R,
    ) -> Result<CountMatrix> {
        let mut counts = self.empty_counts();
        for j in 0..self.loadings.n_samples() {
            for i in 0..self.signatures.n_channels() {
                let mean = self.rates[(i, j)];
                if mean <= 0.0 {
                    continue;
                }
                let (size, p) =
                    bps_prob::neg_binomial::size_p_from_overdispersion(mean, overdispersion)?;
                counts.set(i, j, sampling::neg_binomial(rng, size, p)?);
            }
        }
        Ok(counts)
    }

    fn contamination<R: Rng + ?Sized>(&self, fraction: f64, rng: &mut R) -> Result<CountMatrix> {
        let n_channels = self.signatures.n_channels();
        let n_sigs = self.signatures.n_signatures();
        let mut counts = self.empty_counts();
        let alpha = vec![CONTAMINATION_CONCENTRATION; n_channels];

        for j in 0..self.loadings.n_samples() {
            let error_sig = sampling::dirichlet(rng, &alpha)?;
            let augmented = contaminated_loadings(&self.loadings.sample(j), fraction);
            for i in 0..n_channels {
                let mut lambda = augmented[n_sigs] * error_sig[i];
                for (k, &w) in augmented[..n_sigs].iter().enumerate() {
                    lambda += w * self.signatures.matrix()[(k, i)];
                }
                counts.set(i, j, sampling::poisson(rng, lambda)?);
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_signature_generator(n_samples: usize, scale: f64) -> NoiseModelGenerator {
        let sigs = SignatureSet::from_rows(
            vec!["A".into(), "B".into()],
            &[vec![0.6, 0.3, 0.1, 0.0], vec![0.1, 0.1, 0.2, 0.6]],
        )
        .unwrap();
        let rows = vec![
            (0..n_samples).map(|j| scale * (1 + j % 3) as f64).collect(),
            (0..n_samples).map(|j| scale * (1 + j % 2) as f64).collect(),
        ];
        NoiseModelGenerator::new(LoadingsMatrix::from_rows(&rows).unwrap(), sigs).unwrap()
    }

    #[test]
    fn test_k_mismatch_is_configuration_error() {
        let sigs = SignatureSet::from_rows(vec!["A".into()], &[vec![1.0, 1.0]]).unwrap();
        let loadings = LoadingsMatrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let err = NoiseModelGenerator::new(loadings, sigs).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_same_seed_same_counts_every_variant() {
        let g = two_signature_generator(8, 50.0);
        let models = [
            CorruptionModel::Exact,
            CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(50.0) },
            CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(0.01) },
            CorruptionModel::NegativeBinomial { dispersion: 3.0 },
            CorruptionModel::Contamination { percent: 10.0 },
        ];
        for m in &models {
            assert_eq!(g.generate(m, 17).unwrap(), g.generate(m, 17).unwrap(), "{m}");
        }
    }

    #[test]
    fn test_negbin_one_is_exact() {
        let g = two_signature_generator(6, 30.0);
        let exact = g.generate(&CorruptionModel::Exact, 9).unwrap();
        let nb = g.generate(&CorruptionModel::NegativeBinomial { dispersion: 1.0 }, 9).unwrap();
        assert_eq!(exact, nb);
    }

    #[test]
    fn test_negbin_below_one_rejected_before_drawing() {
        let g = two_signature_generator(2, 1.0);
        let err = g.generate(&CorruptionModel::NegativeBinomial { dispersion: 0.9 }, 1);
        assert!(matches!(err, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_infinite_concentration_is_exact() {
        let g = two_signature_generator(5, 20.0);
        let model =
            CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(f64::INFINITY) };
        assert_eq!(g.generate(&model, 4).unwrap(), g.generate(&CorruptionModel::Exact, 4).unwrap());
    }

    #[test]
    fn test_mean_error_inversion_round_trips() {
        let profile = [0.4, 0.3, 0.2, 0.1];
        let kappa = concentration_for_mean_error(0.05, &profile).unwrap();
        let sparsity = signature_sparsity(&profile);
        let lhs = (0.05 / sparsity).ln();
        let rhs = MEAN_ERROR_INTERCEPT - MEAN_ERROR_SLOPE * kappa.ln();
        assert_relative_eq!(lhs, rhs, epsilon = 1e-12);
        assert_relative_eq!(signature_sparsity(&[0.25; 4]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_contaminated_loadings_conserve_mass() {
        let loading = [12.5, 0.0, 7.25, 100.0];
        for p in [0.0, 0.02, 0.37, 1.0] {
            let aug = contaminated_loadings(&loading, p);
            let original: f64 = loading.iter().sum();
            let kept: f64 = aug[..loading.len()].iter().sum();
            assert_relative_eq!(kept + aug[loading.len()], original, max_relative = 1e-14);
            assert_relative_eq!(aug[loading.len()], p * original, max_relative = 1e-14);
        }
    }

    #[test]
    fn test_channel_labels_length_checked() {
        let g = two_signature_generator(2, 1.0);
        assert!(g.clone().with_channel_labels(vec!["x".into()]).is_err());
        let g = g.with_channel_labels(vec!["a".into(), "b".into(), "c".into(), "d".into()]).unwrap();
        let counts = g.generate(&CorruptionModel::Exact, 1).unwrap();
        assert_eq!(counts.channels()[3], "d");
        assert_eq!(counts.n_samples(), 2);
    }
}
