//! Core traits for bps
//!
//! These seams keep the evaluation logic independent of how posterior runs
//! are stored and which likelihood scores them.

use crate::Result;
use crate::record::PosteriorRunRecord;

/// Approximate evidence for one posterior run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvidenceEstimate {
    /// Approximate log marginal likelihood.
    pub log_evidence: f64,
    /// Standard error of the per-draw log-likelihood mean.
    pub std_error: f64,
    /// Mean log-likelihood over the thinned draws.
    pub expected_log_likelihood: f64,
    /// Number of draws after thinning.
    pub n_draws: usize,
}

/// Scores a posterior run against its data.
pub trait EvidenceModel: Send + Sync {
    /// Evaluate a run using every `skip`-th draw.
    fn evaluate(&self, record: &PosteriorRunRecord, skip: usize) -> Result<EvidenceEstimate>;

    /// Model name for logs.
    fn name(&self) -> &str;
}

/// Source of posterior run records keyed by `(zeta, seed)`.
pub trait RunRecordStore {
    /// Fetch the record for a cell; `Ok(None)` when the run has not produced output.
    fn fetch(&self, zeta: f64, seed: u64) -> Result<Option<PosteriorRunRecord>>;

    /// Human-readable location of a cell (path or key), for logs.
    fn describe(&self, zeta: f64, seed: u64) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Array3;

    struct ConstantModel;

    impl EvidenceModel for ConstantModel {
        fn evaluate(&self, record: &PosteriorRunRecord, skip: usize) -> Result<EvidenceEstimate> {
            Ok(EvidenceEstimate {
                log_evidence: -1.0,
                std_error: 0.0,
                expected_log_likelihood: -1.0,
                n_draws: record.loadings.n_draws().div_ceil(skip),
            })
        }

        fn name(&self) -> &str {
            "Constant"
        }
    }

    #[test]
    fn test_evidence_model_trait_object() {
        let model: Box<dyn EvidenceModel> = Box::new(ConstantModel);
        let arr = Array3::from_fn([1, 1, 10], |_, _, _| 0.0);
        let rec = PosteriorRunRecord {
            loadings: arr.clone(),
            signatures: arr.clone(),
            expected_loadings: arr,
            runtime: 0.0,
            hyperparameters: Default::default(),
            counts: None,
        };
        let est = model.evaluate(&rec, 3).unwrap();
        assert_eq!(est.n_draws, 4);
        assert_eq!(model.name(), "Constant");
    }
}
