//! Seeded random draws used by the synthetic-count generators.
//!
//! Every generator owns its own [`RandomStream`], built from an explicit seed,
//! so identical inputs reproduce identical draws without any process-wide state.

use bps_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, Poisson};

/// Owned random stream for one generation call.
pub type RandomStream = StdRng;

/// Build the random stream for `seed`.
pub fn random_stream(seed: u64) -> RandomStream {
    StdRng::seed_from_u64(seed)
}

/// One Poisson draw. A zero rate is deterministically zero.
pub fn poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> Result<u64> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(Error::Validation(format!(
            "Poisson rate must be finite and >= 0, got {}",
            lambda
        )));
    }
    if lambda == 0.0 {
        return Ok(0);
    }
    let dist = Poisson::new(lambda)
        .map_err(|e| Error::Validation(format!("Poisson({lambda}) rejected: {e}")))?;
    let draw: f64 = dist.sample(rng);
    Ok(draw as u64)
}

/// One Gamma draw with `shape` and `scale`.
pub fn gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64, scale: f64) -> Result<f64> {
    if !shape.is_finite() || shape <= 0.0 {
        return Err(Error::Validation(format!("shape must be finite and > 0, got {}", shape)));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::Validation(format!("scale must be finite and > 0, got {}", scale)));
    }
    let dist = Gamma::new(shape, scale)
        .map_err(|e| Error::Validation(format!("Gamma({shape}, {scale}) rejected: {e}")))?;
    Ok(dist.sample(rng))
}

/// One Dirichlet draw via normalized unit-scale Gamma variates.
///
/// Very small concentrations can underflow every component to zero; the draw
/// then falls back to the mean `alpha / Σ alpha`.
pub fn dirichlet<R: Rng + ?Sized>(rng: &mut R, alpha: &[f64]) -> Result<Vec<f64>> {
    if alpha.is_empty() {
        return Err(Error::Validation("Dirichlet needs at least one component".to_string()));
    }
    let mut draws = alpha.iter().map(|&a| gamma(rng, a, 1.0)).collect::<Result<Vec<f64>>>()?;
    let total: f64 = draws.iter().sum();
    if total > 0.0 && total.is_finite() {
        draws.iter_mut().for_each(|x| *x /= total);
        return Ok(draws);
    }
    let alpha_total: f64 = alpha.iter().sum();
    Ok(alpha.iter().map(|&a| a / alpha_total).collect())
}

/// One negative-binomial draw (failures before `size` successes, success
/// probability `p`) as a Gamma–Poisson mixture.
pub fn neg_binomial<R: Rng + ?Sized>(rng: &mut R, size: f64, p: f64) -> Result<u64> {
    if !p.is_finite() || p <= 0.0 || p > 1.0 {
        return Err(Error::Validation(format!("p must be finite and in (0,1], got {}", p)));
    }
    if p == 1.0 {
        return Ok(0);
    }
    let rate = gamma(rng, size, (1.0 - p) / p)?;
    poisson(rng, rate)
}
