//! Ground-truth signature trimming and summaries.
//!
//! A signature is kept when it is locally dominant in at least one sample or
//! carries a non-negligible share of all mutations.

use bps_core::{Error, LoadingsMatrix, Result};
use serde::{Deserialize, Serialize};

/// Minimum per-sample share of a signature's loading to count as dominant.
pub const LOCAL_DOMINANCE_THRESHOLD: f64 = 0.1;
/// Minimum share of the grand total loading to count as globally significant.
pub const GLOBAL_SHARE_THRESHOLD: f64 = 0.02;

/// Indices of signatures satisfying the retention rule.
///
/// `k` is kept iff `max_j L[k,j] / Σ_k' L[k',j] > 0.1` or
/// `Σ_j L[k,j] > 0.02 · Σ L`. Samples with zero total loading never make a
/// signature dominant.
pub fn retained_signatures(loadings: &LoadingsMatrix) -> Vec<usize> {
    let grand_total = loadings.grand_total();
    let sample_totals: Vec<f64> =
        (0..loadings.n_samples()).map(|j| loadings.sample_total(j)).collect();

    (0..loadings.n_signatures())
        .filter(|&k| {
            let row = loadings.matrix().row(k);
            let dominant = row
                .iter()
                .zip(&sample_totals)
                .any(|(&l, &total)| total > 0.0 && l / total > LOCAL_DOMINANCE_THRESHOLD);
            dominant || loadings.signature_total(k) > GLOBAL_SHARE_THRESHOLD * grand_total
        })
        .collect()
}

/// One row of the ground-truth summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthEntry {
    /// Mean loading across samples.
    pub mean_loading: f64,
    /// Signature identifier.
    pub signature: String,
}

/// Mean loading per retained signature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundTruthSummary {
    entries: Vec<GroundTruthEntry>,
}

impl GroundTruthSummary {
    /// Summarize `loadings`, optionally applying [`retained_signatures`] first.
    pub fn from_loadings(loadings: &LoadingsMatrix, names: &[String], trim: bool) -> Result<Self> {
        if names.len() != loadings.n_signatures() {
            return Err(Error::Configuration(format!(
                "{} signature names for {} loadings rows",
                names.len(),
                loadings.n_signatures()
            )));
        }
        let keep: Vec<usize> = if trim {
            retained_signatures(loadings)
        } else {
            (0..loadings.n_signatures()).collect()
        };
        let n_samples = loadings.n_samples().max(1) as f64;

        let entries = keep
            .iter()
            .map(|&k| GroundTruthEntry {
                mean_loading: loadings.signature_total(k) / n_samples,
                signature: names[k].clone(),
            })
            .collect::<Vec<_>>();

        let dropped = loadings.n_signatures() - entries.len();
        if dropped > 0 {
            tracing::info!(kept = entries.len(), dropped, "trimmed ground-truth signatures");
        }
        Ok(Self { entries })
    }

    /// Retained entries in signature order.
    pub fn entries(&self) -> &[GroundTruthEntry] {
        &self.entries
    }

    /// Identifiers of the retained signatures.
    pub fn signatures(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.signature.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_row_kept_zero_row_dropped() {
        let loadings = LoadingsMatrix::from_rows(&[vec![100.0; 10], vec![0.0; 10]]).unwrap();
        assert_eq!(retained_signatures(&loadings), vec![0]);
    }

    #[test]
    fn test_globally_significant_but_never_dominant() {
        // Signature 1 is at most 5% of any sample but 4.8% of the total mass.
        let rows = vec![vec![950.0; 20], vec![48.0; 20], vec![2.0; 20]];
        let loadings = LoadingsMatrix::from_rows(&rows).unwrap();
        assert_eq!(retained_signatures(&loadings), vec![0, 1]);
    }

    #[test]
    fn test_locally_dominant_in_one_sample() {
        let mut r0 = vec![1000.0; 10];
        r0[3] = 0.0;
        let mut r1 = vec![0.0; 10];
        r1[3] = 5.0;
        let loadings = LoadingsMatrix::from_rows(&[r0, r1]).unwrap();
        assert_eq!(retained_signatures(&loadings), vec![0, 1]);
    }

    #[test]
    fn test_summary_means_and_names() {
        let loadings = LoadingsMatrix::from_rows(&[vec![10.0, 30.0], vec![0.0, 0.0]]).unwrap();
        let names = vec!["SBS1".to_string(), "SBS5".to_string()];
        let trimmed = GroundTruthSummary::from_loadings(&loadings, &names, true).unwrap();
        assert_eq!(trimmed.signatures(), vec!["SBS1"]);
        assert_relative_eq!(trimmed.entries()[0].mean_loading, 20.0);

        let full = GroundTruthSummary::from_loadings(&loadings, &names, false).unwrap();
        assert_eq!(full.entries().len(), 2);
        assert!(GroundTruthSummary::from_loadings(&loadings, &names[..1], false).is_err());
    }
}
