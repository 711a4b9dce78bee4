//! Experiment catalog: the deterministic list of synthetic-data variants.
//!
//! Identifiers are `{seed}` for the uncorrupted data and
//! `{seed}-{variant}-{param}` otherwise, inserted in the order correct,
//! perturbed, contamination, overdispersed, dirichlet. The manifest on disk
//! is append-only: identifiers already present keep their position.

use std::path::{Path, PathBuf};

use bps_core::{CorruptionModel, Dispersion, Error, Result};
use serde::{Deserialize, Serialize};

use crate::generator::NoiseModelGenerator;
use crate::io;
use crate::trim::GroundTruthSummary;

/// One synthetic-data variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    /// Identifier used in file names and the manifest.
    pub id: String,
    /// Data-generation seed.
    pub seed: u64,
    /// Corruption applied.
    pub model: CorruptionModel,
}

/// Parameter lists from which the experiment variants are enumerated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentCatalog {
    /// Data-generation seed shared by every variant.
    pub seed: u64,
    /// Target mean errors for perturbed signatures.
    #[serde(default)]
    pub perturbed: Vec<f64>,
    /// Contamination percentages.
    #[serde(default)]
    pub contamination: Vec<f64>,
    /// Negative-binomial overdispersion factors.
    #[serde(default)]
    pub overdispersed: Vec<f64>,
    /// Raw Dirichlet concentrations.
    #[serde(default)]
    pub dirichlet: Vec<f64>,
}

impl ExperimentCatalog {
    /// Catalog with only the uncorrupted variant.
    pub fn new(seed: u64) -> Self {
        Self { seed, ..Default::default() }
    }

    /// Set the perturbed (target mean error) parameters.
    pub fn with_perturbed(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.perturbed = values.into();
        self
    }

    /// Set the contamination percentages.
    pub fn with_contamination(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.contamination = values.into();
        self
    }

    /// Set the negative-binomial overdispersion factors.
    pub fn with_overdispersed(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.overdispersed = values.into();
        self
    }

    /// Set raw Dirichlet concentrations.
    pub fn with_dirichlet(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.dirichlet = values.into();
        self
    }

    /// Enumerate variants in manifest order, deduplicated by identifier.
    ///
    /// Every model is validated first, so an invalid parameter fails before
    /// anything is generated or written.
    pub fn experiments(&self) -> Result<Vec<Experiment>> {
        let models = std::iter::once(CorruptionModel::Exact)
            .chain(self.perturbed.iter().map(|&v| CorruptionModel::Overdispersed {
                dispersion: Dispersion::MeanError(v),
            }))
            .chain(self.contamination.iter().map(|&v| CorruptionModel::Contamination { percent: v }))
            .chain(
                self.overdispersed
                    .iter()
                    .map(|&v| CorruptionModel::NegativeBinomial { dispersion: v }),
            )
            .chain(self.dirichlet.iter().map(|&v| CorruptionModel::Overdispersed {
                dispersion: Dispersion::Concentration(v),
            }));

        let mut out: Vec<Experiment> = Vec::new();
        for model in models {
            model.validate()?;
            let id = model.experiment_id(self.seed);
            if out.iter().any(|e| e.id == id) {
                continue;
            }
            out.push(Experiment { id, seed: self.seed, model });
        }
        Ok(out)
    }

    /// Identifiers in manifest order.
    pub fn ids(&self) -> Result<Vec<String>> {
        Ok(self.experiments()?.into_iter().map(|e| e.id).collect())
    }

    /// Append identifiers not yet listed in the manifest at `path`.
    ///
    /// Returns the full manifest after the update.
    pub fn write_manifest(&self, path: &Path) -> Result<Vec<String>> {
        let mut manifest = if path.is_file() { read_manifest(path)? } else { Vec::new() };
        let before = manifest.len();
        for id in self.ids()? {
            if !manifest.contains(&id) {
                manifest.push(id);
            }
        }
        if manifest.len() != before || !path.is_file() {
            let mut text = manifest.join("\n");
            text.push('\n');
            bps_core::write_atomic(path, text.as_bytes())?;
        }
        tracing::info!(
            path = %path.display(),
            total = manifest.len(),
            added = manifest.len() - before,
            "experiment manifest updated"
        );
        Ok(manifest)
    }

    /// Generate and write every variant's count table under `dir`.
    ///
    /// Existing tables are left untouched unless `overwrite` is set.
    pub fn materialize(
        &self,
        generator: &NoiseModelGenerator,
        dir: &Path,
        prefix: &str,
        overwrite: bool,
    ) -> Result<Vec<PathBuf>> {
        let experiments = self.experiments()?;
        let mut written = Vec::with_capacity(experiments.len());
        for exp in &experiments {
            let path = dir.join(data_file_name(prefix, &exp.id));
            if path.exists() && !overwrite {
                tracing::info!(path = %path.display(), "synthetic counts already present; skipping");
                written.push(path);
                continue;
            }
            let counts = generator.generate(&exp.model, exp.seed)?;
            tracing::info!(
                experiment = %exp.id,
                variant = %exp.model,
                mean_count = counts.mean(),
                "generated synthetic counts"
            );
            io::write_counts_tsv(&path, &counts)?;
            written.push(path);
        }
        Ok(written)
    }

    /// Write the retained ground-truth loadings for this catalog's seed.
    pub fn write_ground_truth(
        &self,
        summary: &GroundTruthSummary,
        dir: &Path,
        prefix: &str,
    ) -> Result<PathBuf> {
        let path = dir.join(ground_truth_file_name(prefix, self.seed));
        io::write_ground_truth(&path, summary)?;
        Ok(path)
    }
}

/// Count-table file name for an experiment identifier.
pub fn data_file_name(prefix: &str, experiment_id: &str) -> String {
    format!("{prefix}-seed-{experiment_id}.tsv")
}

/// Ground-truth loadings file name.
pub fn ground_truth_file_name(prefix: &str, seed: u64) -> String {
    format!("{prefix}-seed-{seed}-GT-loadings.csv")
}

/// Read a manifest: one identifier per non-empty line.
pub fn read_manifest(path: &Path) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::MissingArtifact { path: path.to_path_buf() });
    }
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect())
}
