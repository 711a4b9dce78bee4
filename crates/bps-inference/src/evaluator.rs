//! Per-zeta evidence evaluation across sampler seeds.

use std::path::Path;

use bps_core::{
    Error, EvidenceEstimate, EvidenceModel, PosteriorRunRecord, Result, RunRecordStore,
};
use bps_prob::math;

use crate::evidence::{ACTIVITY_CUTOFF, expected_k};
use crate::summary::{EvidenceSummary, SeedEvaluation, ZetaEvaluation};

/// Default thinning factor for posterior draws.
pub const DEFAULT_SKIP: usize = 25;

/// Scores every seed of every zeta and picks the best seed per zeta.
///
/// A missing, unreadable or mis-shaped run record never aborts the scan: it
/// contributes `-inf` evidence and `NaN` `K`. An ambiguous record match is
/// fatal since it needs a human decision, as is a [`Error::Configuration`]
/// from the evidence model (no counts to score against).
pub struct RunEvidenceEvaluator<M: EvidenceModel> {
    model: M,
    skip: usize,
}

impl<M: EvidenceModel> RunEvidenceEvaluator<M> {
    /// Evaluator with the default thinning.
    pub fn new(model: M) -> Self {
        Self { model, skip: DEFAULT_SKIP }
    }

    /// Keep every `skip`-th draw.
    pub fn with_skip(mut self, skip: usize) -> Result<Self> {
        if skip == 0 {
            return Err(Error::Configuration("skip must be >= 1".to_string()));
        }
        self.skip = skip;
        Ok(self)
    }

    /// Thinning factor.
    pub fn skip(&self) -> usize {
        self.skip
    }

    /// Evaluate one seed.
    pub fn evaluate_seed(
        &self,
        store: &dyn RunRecordStore,
        zeta: f64,
        seed: u64,
    ) -> Result<SeedEvaluation> {
        let record = match store.fetch(zeta, seed) {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(zeta, seed, location = %store.describe(zeta, seed), "run missing");
                return Ok(SeedEvaluation::missing(seed));
            }
            Err(e @ Error::AmbiguousMatch { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(zeta, seed, error = %e, "unreadable run record; treating as missing");
                return Ok(SeedEvaluation::missing(seed));
            }
        };

        let (estimate, k) = match self.score(&record) {
            Ok(scored) => scored,
            Err(e @ Error::Configuration(_)) => return Err(e),
            Err(e) => {
                tracing::warn!(
                    zeta,
                    seed,
                    error = %e,
                    "run record cannot be scored; treating as missing"
                );
                return Ok(SeedEvaluation::missing(seed));
            }
        };
        tracing::debug!(
            zeta,
            seed,
            log_evidence = estimate.log_evidence,
            k,
            model = self.model.name(),
            "seed evaluated"
        );
        Ok(SeedEvaluation {
            seed,
            available: true,
            log_evidence: estimate.log_evidence,
            std_error: estimate.std_error,
            expected_log_likelihood: estimate.expected_log_likelihood,
            k,
            runtime: record.runtime,
        })
    }

    fn score(&self, record: &PosteriorRunRecord) -> Result<(EvidenceEstimate, f64)> {
        let estimate = self.model.evaluate(record, self.skip)?;
        let thinned = record.expected_loadings.thin(0, self.skip)?;
        Ok((estimate, expected_k(&thinned, ACTIVITY_CUTOFF) as f64))
    }

    /// Evaluate every seed at `zeta` and select the best one.
    pub fn evaluate_zeta(
        &self,
        store: &dyn RunRecordStore,
        zeta: f64,
        seeds: &[u64],
    ) -> Result<ZetaEvaluation> {
        let evals =
            seeds.iter().map(|&s| self.evaluate_seed(store, zeta, s)).collect::<Result<Vec<_>>>()?;
        let evidence: Vec<f64> = evals.iter().map(|e| e.log_evidence).collect();
        let runtimes: Vec<f64> = evals.iter().map(|e| e.runtime).collect();
        let best = math::argmax_first(&evidence);

        let available = evals.iter().filter(|e| e.available).count();
        if available < evals.len() {
            tracing::warn!(zeta, missing = evals.len() - available, "runs missing for zeta");
        }

        Ok(ZetaEvaluation {
            zeta,
            best_seed: best.map(|i| evals[i].seed),
            log_evidence: best.map_or(f64::NEG_INFINITY, |i| evals[i].log_evidence),
            k: best.map_or(f64::NAN, |i| evals[i].k),
            runtime: math::nan_mean(&runtimes),
            seeds: evals,
        })
    }

    /// Evaluate the whole `zetas × seeds` grid into a summary.
    pub fn evaluate(
        &self,
        store: &dyn RunRecordStore,
        experiment: &str,
        variant: &str,
        zetas: &[f64],
        seeds: &[u64],
    ) -> Result<EvidenceSummary> {
        let evaluations = zetas
            .iter()
            .map(|&z| {
                let e = self.evaluate_zeta(store, z, seeds)?;
                tracing::info!(
                    zeta = z,
                    best_seed = ?e.best_seed,
                    log_evidence = e.log_evidence,
                    k = e.k,
                    "zeta evaluated"
                );
                Ok(e)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(EvidenceSummary::from_evaluations(experiment, variant, self.skip, evaluations))
    }

    /// Cached evaluation: reuse the summary at `cache` unless it is absent,
    /// `force` is set, or it was computed for other zetas, seeds or thinning.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_cached(
        &self,
        store: &dyn RunRecordStore,
        experiment: &str,
        variant: &str,
        zetas: &[f64],
        seeds: &[u64],
        cache: &Path,
        force: bool,
    ) -> Result<EvidenceSummary> {
        if !force && cache.is_file() {
            let cached = EvidenceSummary::load(cache)?;
            if self.matches_request(&cached, zetas, seeds) {
                tracing::info!(path = %cache.display(), "summary cache hit");
                return Ok(cached);
            }
            tracing::warn!(
                path = %cache.display(),
                cached_skip = cached.skip,
                cached_zetas = ?cached.zetas,
                "cached summary was computed for another grid; recomputing"
            );
        }
        let summary = self.evaluate(store, experiment, variant, zetas, seeds)?;
        summary.save(cache)?;
        tracing::info!(path = %cache.display(), zetas = summary.len(), "summary written");
        Ok(summary)
    }

    fn matches_request(&self, summary: &EvidenceSummary, zetas: &[f64], seeds: &[u64]) -> bool {
        summary.skip == self.skip
            && summary.zetas == zetas
            && summary.seeds.len() == zetas.len()
            && summary.seeds.iter().all(|row| row.iter().map(|e| e.seed).eq(seeds.iter().copied()))
    }
}
