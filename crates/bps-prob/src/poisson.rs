//! Poisson distribution utilities.

use bps_core::{Error, Result};
use statrs::function::gamma::ln_gamma;

/// Log-PMF of a Poisson distribution with rate `lambda` at `k`.
///
/// `lambda = 0` is the point mass at zero.
pub fn logpmf(k: u64, lambda: f64) -> Result<f64> {
    if !lambda.is_finite() || lambda < 0.0 {
        return Err(Error::Validation(format!(
            "lambda must be finite and >= 0, got {}",
            lambda
        )));
    }
    if lambda == 0.0 {
        return Ok(if k == 0 { 0.0 } else { f64::NEG_INFINITY });
    }
    let kf = k as f64;
    Ok(kf * lambda.ln() - lambda - ln_gamma(kf + 1.0))
}

/// Negative log-likelihood for Poisson(lambda).
pub fn nll(k: u64, lambda: f64) -> Result<f64> {
    Ok(-logpmf(k, lambda)?)
}
