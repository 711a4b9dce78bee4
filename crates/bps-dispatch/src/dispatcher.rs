//! Job dispatcher: submit sampler runs for every cell without a result.
//!
//! Each pass takes a snapshot of the results directory, diffs it against the
//! `zeta × variant × seed` grid and issues one array job per `(zeta, variant)`
//! pair with missing seeds. Nothing distinguishes a queued run from one that
//! was never submitted, so every missing cell is submitted again on every
//! pass (at-least-once). Passes are repeated until nothing is missing.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bps_core::{Error, NameFields, NameTemplate, Result, format_param, matching_files};
use bps_synth::data_file_name;

use crate::ledger::{CellKey, DispatchLedger, LEDGER_FILE};
use crate::submit::{SubmissionRequest, Submitter};

/// Message logged when a pass finds nothing to submit.
pub const ALL_COMPLETE_MESSAGE: &str = "All sampling completed. Proceed to next step.";

/// Sampler script, relative to the experiment directory.
pub const RUN_SCRIPT: &str = "experiment_scripts/run_nmf.sh";

/// The `zeta × variant × seed` grid of sampler runs.
///
/// With no variants the grid covers the original counts (empty variant).
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchGrid {
    zetas: Vec<f64>,
    variants: Vec<String>,
    seeds: Vec<u64>,
}

impl DispatchGrid {
    /// Build a grid; zetas must be finite and positive.
    pub fn new(zetas: Vec<f64>, variants: Vec<String>, seeds: Vec<u64>) -> Result<Self> {
        if let Some(z) = zetas.iter().find(|z| !z.is_finite() || **z <= 0.0) {
            return Err(Error::Configuration(format!("zeta must be finite and > 0, got {z}")));
        }
        Ok(Self { zetas, variants, seeds })
    }

    /// `true` when the grid targets the original counts.
    pub fn is_original(&self) -> bool {
        self.variants.is_empty()
    }

    /// Zeta values.
    pub fn zetas(&self) -> &[f64] {
        &self.zetas
    }

    /// Seeds.
    pub fn seeds(&self) -> &[u64] {
        &self.seeds
    }

    fn variant_labels(&self) -> Vec<&str> {
        if self.variants.is_empty() {
            vec![""]
        } else {
            self.variants.iter().map(String::as_str).collect()
        }
    }

    /// Every cell as `(zeta, variant, seed)`, zeta-major.
    pub fn cells(&self) -> Vec<(f64, &str, u64)> {
        let variants = self.variant_labels();
        let mut out = Vec::with_capacity(self.zetas.len() * variants.len() * self.seeds.len());
        for &zeta in &self.zetas {
            for &variant in &variants {
                for &seed in &self.seeds {
                    out.push((zeta, variant, seed));
                }
            }
        }
        out
    }

    /// Every cell key, zeta-major.
    pub fn keys(&self) -> Vec<CellKey> {
        self.cells().into_iter().map(|(z, v, s)| CellKey::new(z, v, s)).collect()
    }
}

/// Cells of `grid` not in `completed`, in grid order.
pub fn missing_cells(grid: &DispatchGrid, completed: &BTreeSet<CellKey>) -> Vec<CellKey> {
    grid.keys().into_iter().filter(|k| !completed.contains(k)).collect()
}

/// Result of one dispatcher pass.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Nothing missing; proceed to evaluation.
    AllComplete,
    /// Requests issued this pass, plus job names whose command could not launch.
    Submitted {
        /// Issued requests.
        requests: Vec<SubmissionRequest>,
        /// Job names that failed to launch.
        failed: Vec<String>,
    },
}

/// Dispatcher over one experiment directory.
#[derive(Debug, Clone)]
pub struct JobDispatcher {
    experiment_dir: PathBuf,
    prefix: String,
    output_template: NameTemplate,
    grid: DispatchGrid,
}

impl JobDispatcher {
    /// Dispatcher for `grid`, with results under `{experiment_dir}/results`.
    pub fn new(
        experiment_dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        output_template: NameTemplate,
        grid: DispatchGrid,
    ) -> Self {
        Self { experiment_dir: experiment_dir.into(), prefix: prefix.into(), output_template, grid }
    }

    /// Results directory.
    pub fn results_dir(&self) -> PathBuf {
        self.experiment_dir.join("results")
    }

    /// Ledger location.
    pub fn ledger_path(&self) -> PathBuf {
        self.experiment_dir.join(LEDGER_FILE)
    }

    /// The grid.
    pub fn grid(&self) -> &DispatchGrid {
        &self.grid
    }

    /// Snapshot of the cells whose result file exists.
    pub fn scan(&self) -> Result<BTreeSet<CellKey>> {
        let dir = self.results_dir();
        let mut done = BTreeSet::new();
        for (zeta, variant, seed) in self.grid.cells() {
            let pattern = self.output_template.render(&NameFields { exp: variant, seed, zeta });
            if !matching_files(&dir, &pattern)?.is_empty() {
                done.insert(CellKey::new(zeta, variant, seed));
            }
        }
        Ok(done)
    }

    /// Requests covering every cell not in `completed`.
    pub fn plan(&self, completed: &BTreeSet<CellKey>) -> Vec<SubmissionRequest> {
        let mut requests = Vec::new();
        for &zeta in self.grid.zetas() {
            for variant in self.grid.variant_labels() {
                let seeds: Vec<u64> = self
                    .grid
                    .seeds()
                    .iter()
                    .copied()
                    .filter(|&s| !completed.contains(&CellKey::new(zeta, variant, s)))
                    .collect();
                if !seeds.is_empty() {
                    requests.push(self.request(zeta, variant, seeds));
                }
            }
        }
        requests
    }

    fn request(&self, zeta: f64, variant: &str, seeds: Vec<u64>) -> SubmissionRequest {
        let (job_prefix, data_file) = if variant.is_empty() {
            (self.prefix.clone(), format!("{}_original_counts.tsv", self.prefix))
        } else {
            let data_file = data_file_name(&self.prefix, variant);
            let stem = data_file.trim_end_matches(".tsv").to_string();
            (stem, data_file)
        };
        let logs = self.experiment_dir.join("logs");
        SubmissionRequest {
            job_name: format!("{job_prefix}_NMF_{}", format_param(zeta)),
            zeta,
            variant: variant.to_string(),
            seeds,
            data_file,
            script: self.experiment_dir.join(RUN_SCRIPT),
            stdout_log: logs.join(format!("output_%A_%a_NMF_{job_prefix}.out")),
            stderr_log: logs.join(format!("error_%A_%a_NMF_{job_prefix}.err")),
        }
    }

    /// One pass: scan, update the ledger, submit what is missing.
    pub fn dispatch(&self, submitter: &mut dyn Submitter) -> Result<DispatchOutcome> {
        self.pass(submitter, true)
    }

    /// A pass that hands every request to `submitter` but leaves the ledger
    /// on disk untouched. Pair with a [`DryRunSubmitter`](crate::DryRunSubmitter)
    /// to see what [`dispatch`](Self::dispatch) would issue.
    pub fn preview(&self, submitter: &mut dyn Submitter) -> Result<DispatchOutcome> {
        self.pass(submitter, false)
    }

    fn pass(&self, submitter: &mut dyn Submitter, persist: bool) -> Result<DispatchOutcome> {
        let ledger_path = self.ledger_path();
        let mut ledger = DispatchLedger::load(&ledger_path)?;
        let save = |ledger: &DispatchLedger| {
            if persist { ledger.save(&ledger_path) } else { Ok(()) }
        };
        let completed = self.scan()?;
        for key in self.grid.keys() {
            let present = completed.contains(&key);
            ledger.observe(&key, present);
        }
        tracing::debug!(
            completed = completed.len(),
            missing = missing_cells(&self.grid, &completed).len(),
            "results scanned"
        );

        let requests = self.plan(&completed);
        if requests.is_empty() {
            tracing::info!("{ALL_COMPLETE_MESSAGE}");
            save(&ledger)?;
            return Ok(DispatchOutcome::AllComplete);
        }

        let mut failed = Vec::new();
        for req in &requests {
            let keys = req.seeds.iter().map(|&s| CellKey::new(req.zeta, &req.variant, s));
            match submitter.submit(req) {
                Ok(()) => {
                    keys.for_each(|k| ledger.mark_submitted(&k));
                    tracing::info!(job = %req.job_name, seeds = %req.array_spec(), "submitted");
                }
                Err(Error::Submission(msg)) => {
                    keys.for_each(|k| ledger.mark_failed(&k));
                    tracing::warn!(job = %req.job_name, error = %msg, "submission failed");
                    failed.push(req.job_name.clone());
                }
                Err(e) => {
                    save(&ledger)?;
                    return Err(e);
                }
            }
        }
        save(&ledger)?;
        tracing::info!(
            jobs = requests.len(),
            failed = failed.len(),
            states = ?ledger.counts(),
            persisted = persist,
            "dispatch pass done"
        );
        Ok(DispatchOutcome::Submitted { requests, failed })
    }
}

/// Experiment directory layout used by the dispatcher and the CLI.
pub fn experiment_subdirs(experiment_dir: &Path) -> [PathBuf; 5] {
    ["synthetic_data", "results", "figures", "logs", "experiment_scripts"]
        .map(|d| experiment_dir.join(d))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispatcher(variants: Vec<String>) -> JobDispatcher {
        let grid = DispatchGrid::new(vec![0.1, 1.0], variants, vec![1, 2, 3]).unwrap();
        let template = NameTemplate::parse("{exp}_{zeta}_{seed}.json").unwrap();
        JobDispatcher::new("/exp", "syn", template, grid)
    }

    #[test]
    fn test_plan_groups_by_zeta_and_variant() {
        let d = dispatcher(vec!["1".into(), "1-contamination-2.0".into()]);
        let mut done = BTreeSet::new();
        done.insert(CellKey::new(0.1, "1", 2));
        let plan = d.plan(&done);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan[0].job_name, "syn-seed-1_NMF_0.1");
        assert_eq!(plan[0].array_spec(), "1,3");
        assert_eq!(plan[0].data_file, "syn-seed-1.tsv");
        assert_eq!(plan[1].data_file, "syn-seed-1-contamination-2.0.tsv");
        assert_eq!(plan[3].job_name, "syn-seed-1-contamination-2.0_NMF_1.0");
        assert_eq!(plan[0].script, PathBuf::from("/exp/experiment_scripts/run_nmf.sh"));
    }

    #[test]
    fn test_original_counts_stage() {
        let d = dispatcher(Vec::new());
        assert!(d.grid().is_original());
        let plan = d.plan(&BTreeSet::new());
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].job_name, "syn_NMF_0.1");
        assert_eq!(plan[0].data_file, "syn_original_counts.tsv");
        assert_eq!(plan[0].variant, "");
    }

    #[test]
    fn test_invalid_zeta_rejected() {
        assert!(DispatchGrid::new(vec![0.0], vec![], vec![1]).is_err());
        assert!(DispatchGrid::new(vec![f64::NAN], vec![], vec![1]).is_err());
    }
}
