//! Finite-difference diagnostics of evidence curves.
//!
//! For a curve `(x, y)` with strictly increasing `x`:
//! - first difference `d_i = (y_{i+1} − y_i) / (x_{i+1} − x_i)`
//! - second difference `c_i = |2 (d_{i+1} − d_i) / (Δx_i + Δx_{i+1})|`
//! - normalized `c_i / (d_i + d_{i+1})` and squared-normalized
//!   `c_i / (d_i + d_{i+1})²`
//!
//! Second differences sit at the interior points `x_1 … x_{n−2}`; the elbow
//! of a curve is the interior point with the largest second difference.

use bps_core::{Error, Result};
use bps_prob::math;
use serde::Serialize;

use crate::summary::{EvidenceSummary, json_float};

/// Diagnostics of one evidence curve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveDiagnostics {
    /// Curve name (`zeta`, `k_plus_zeta`, `k`).
    pub name: String,
    /// Abscissae.
    #[serde(with = "json_float::vec")]
    pub x: Vec<f64>,
    /// Evidence values.
    #[serde(with = "json_float::vec")]
    pub y: Vec<f64>,
    /// First differences (`n − 1`).
    #[serde(with = "json_float::vec")]
    pub first: Vec<f64>,
    /// Absolute second differences (`n − 2`).
    #[serde(with = "json_float::vec")]
    pub second: Vec<f64>,
    /// Second differences over the sum of adjacent slopes.
    #[serde(with = "json_float::vec")]
    pub normalized: Vec<f64>,
    /// Second differences over the squared sum of adjacent slopes.
    #[serde(with = "json_float::vec")]
    pub normalized_sq: Vec<f64>,
    /// Interior `x` with the largest second difference.
    pub elbow: Option<f64>,
}

impl CurveDiagnostics {
    /// Compute diagnostics for `(x, y)`.
    ///
    /// Fails with [`Error::Precondition`] unless there are at least two
    /// points, all finite in `x`, and `x` is strictly increasing.
    pub fn new(name: &str, x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::Precondition(format!(
                "curve '{name}': {} x values but {} y values",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(Error::Precondition(format!(
                "curve '{name}' needs at least 2 points, got {}",
                x.len()
            )));
        }
        if let Some(bad) = x.iter().find(|v| !v.is_finite()) {
            return Err(Error::Precondition(format!("curve '{name}' has non-finite x {bad}")));
        }
        if let Some(w) = x.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::Precondition(format!(
                "curve '{name}' x must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }

        let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let first: Vec<f64> = y.windows(2).zip(&dx).map(|(w, d)| (w[1] - w[0]) / d).collect();
        let second: Vec<f64> = first
            .windows(2)
            .zip(dx.windows(2))
            .map(|(d, h)| (2.0 * (d[1] - d[0]) / (h[0] + h[1])).abs())
            .collect();
        let slope_sums: Vec<f64> = first.windows(2).map(|d| d[0] + d[1]).collect();
        let normalized = second.iter().zip(&slope_sums).map(|(c, s)| c / s).collect();
        let normalized_sq = second.iter().zip(&slope_sums).map(|(c, s)| c / (s * s)).collect();
        let elbow = math::argmax_first(&second).map(|i| x[i + 1]);

        Ok(Self {
            name: name.to_string(),
            x: x.to_vec(),
            y: y.to_vec(),
            first,
            second,
            normalized,
            normalized_sq,
            elbow,
        })
    }
}

/// Diagnostics over the three curves of an evidence summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZetaDiagnostics {
    /// Evidence against zeta.
    pub zeta: CurveDiagnostics,
    /// Evidence against `K + zeta`; absent when that axis is not increasing.
    pub k_plus_zeta: Option<CurveDiagnostics>,
    /// Evidence against distinct `K` (first zeta per `K`); absent with fewer
    /// than two distinct values.
    pub k: Option<CurveDiagnostics>,
}

impl ZetaDiagnostics {
    /// Diagnose the valid zetas of `summary`.
    ///
    /// The zeta curve must satisfy the [`CurveDiagnostics::new`] contract.
    /// The derived curves are skipped with a warning when they do not.
    pub fn from_summary(summary: &EvidenceSummary) -> Result<Self> {
        let valid = summary.valid();
        let zeta = CurveDiagnostics::new("zeta", &valid.zetas, &valid.log_evidence)?;

        let kz: Vec<f64> = valid.k.iter().zip(&valid.zetas).map(|(k, z)| k + z).collect();
        let k_plus_zeta = optional_curve("k_plus_zeta", &kz, &valid.log_evidence);

        let (ks, ys) = distinct_k(&valid.k, &valid.log_evidence);
        let k = optional_curve("k", &ks, &ys);

        if let Some(elbow) = zeta.elbow {
            tracing::info!(variant = %summary.variant, elbow, "zeta elbow");
        }
        Ok(Self { zeta, k_plus_zeta, k })
    }

    /// Every computed curve.
    pub fn curves(&self) -> Vec<&CurveDiagnostics> {
        std::iter::once(&self.zeta).chain(self.k_plus_zeta.as_ref()).chain(self.k.as_ref()).collect()
    }
}

fn optional_curve(name: &str, x: &[f64], y: &[f64]) -> Option<CurveDiagnostics> {
    match CurveDiagnostics::new(name, x, y) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(curve = name, error = %e, "skipping curve");
            None
        }
    }
}

/// Sorted distinct `K` values, each with the evidence of its first occurrence.
pub fn distinct_k(ks: &[f64], evidence: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = Vec::new();
    for (&k, &y) in ks.iter().zip(evidence) {
        if k.is_nan() || pairs.iter().any(|&(seen, _)| seen == k) {
            continue;
        }
        pairs.push((k, y));
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    pairs.into_iter().unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::ZetaEvaluation;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_curve() {
        let x = [0.2, 0.4, 0.6, 0.8, 1.0];
        let y: Vec<f64> = x.iter().map(|z| -3.5 * z + 12.0).collect();
        let c = CurveDiagnostics::new("zeta", &x, &y).unwrap();
        assert_eq!(c.first.len(), 4);
        assert_eq!(c.second.len(), 3);
        for d in &c.first {
            assert_relative_eq!(*d, -3.5, epsilon = 1e-9);
        }
        for d in &c.second {
            assert!(d.abs() < 1e-9);
        }
    }

    #[test]
    fn test_uneven_spacing_quadratic() {
        // y = x² has constant second derivative 2 on any grid.
        let x = [0.1, 0.2, 0.4, 0.8, 1.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let c = CurveDiagnostics::new("q", &x, &y).unwrap();
        for d in &c.second {
            assert_relative_eq!(*d, 2.0, epsilon = 1e-9);
        }
        assert_relative_eq!(c.normalized[0], 2.0 / (0.3 + 0.6), epsilon = 1e-9);
        assert_relative_eq!(c.normalized_sq[0], 2.0 / (0.9 * 0.9), epsilon = 1e-9);
    }

    #[test]
    fn test_elbow_at_kink() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [0.0, 10.0, 20.0, 21.0, 22.0];
        let c = CurveDiagnostics::new("k", &x, &y).unwrap();
        assert_eq!(c.elbow, Some(3.0));
    }

    #[test]
    fn test_precondition_violations() {
        let err = CurveDiagnostics::new("z", &[0.1, 0.1, 0.2], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(CurveDiagnostics::new("z", &[0.3, 0.2], &[1.0, 2.0]).is_err());
        assert!(CurveDiagnostics::new("z", &[0.1], &[1.0]).is_err());
        assert!(CurveDiagnostics::new("z", &[0.1, f64::NAN], &[1.0, 2.0]).is_err());
        assert!(CurveDiagnostics::new("z", &[0.1, 0.2], &[1.0]).is_err());
    }

    #[test]
    fn test_distinct_k_keeps_first_evidence() {
        let (ks, ys) = distinct_k(&[3.0, 3.0, 2.0, f64::NAN, 5.0], &[-10.0, -5.0, -20.0, 0.0, -1.0]);
        assert_eq!(ks, vec![2.0, 3.0, 5.0]);
        assert_eq!(ys, vec![-20.0, -10.0, -1.0]);
    }

    #[test]
    fn test_from_summary_filters_invalid_zetas() {
        let eval = |zeta: f64, k: f64, y: f64| ZetaEvaluation {
            zeta,
            best_seed: Some(1),
            log_evidence: y,
            k,
            runtime: 1.0,
            seeds: Vec::new(),
        };
        let summary = EvidenceSummary::from_evaluations(
            "e",
            "1",
            25,
            vec![
                eval(0.1, 2.0, -50.0),
                eval(0.2, f64::NAN, f64::NEG_INFINITY),
                eval(0.3, 3.0, -40.0),
                eval(0.4, 3.0, -38.0),
                eval(0.6, 4.0, -37.0),
            ],
        );
        let diag = ZetaDiagnostics::from_summary(&summary).unwrap();
        assert_eq!(diag.zeta.x, vec![0.1, 0.3, 0.4, 0.6]);
        assert!(diag.k_plus_zeta.is_some());
        let k = diag.k.as_ref().unwrap();
        assert_eq!(k.x, vec![2.0, 3.0, 4.0]);
        assert_eq!(k.y, vec![-50.0, -40.0, -37.0]);
        assert_eq!(diag.curves().len(), 3);
    }
}
