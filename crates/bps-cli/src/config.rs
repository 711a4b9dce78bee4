//! Experiment configuration (YAML or JSON).

use anyhow::{Context, Result, bail};
use bps_core::{NameTemplate, SubstitutionType};
use bps_dispatch::SubmitCommand;
use bps_synth::ExperimentCatalog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manifest of experiment identifiers inside an experiment directory.
pub const MANIFEST_FILE: &str = "experiment_list.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment directory name under `root`.
    pub experiment_name: String,
    /// Directory holding experiment directories.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Prefix of synthetic count files.
    pub synthetic_prefix: String,
    #[serde(default = "default_seed")]
    pub synthetic_data_seed: u64,

    /// Target mean errors of perturbed signatures.
    #[serde(default = "default_perturbed")]
    pub perturbed: Vec<f64>,
    /// Contamination percentages.
    #[serde(default = "default_contamination")]
    pub contamination: Vec<f64>,
    /// Negative-binomial overdispersion factors.
    #[serde(default = "default_overdispersed")]
    pub overdispersed: Vec<f64>,
    /// Raw Dirichlet concentrations.
    #[serde(default)]
    pub dirichlet: Vec<f64>,
    /// Drop negligible signatures from the ground-truth summary.
    #[serde(default = "default_true")]
    pub trim_sigs: bool,

    #[serde(default = "default_zetas")]
    pub zetas: Vec<f64>,
    /// Sampler seeds `1..=no_chains`.
    #[serde(default = "default_chains")]
    pub no_chains: u64,
    /// Posterior thinning factor.
    #[serde(default = "default_skip")]
    pub skip: usize,
    /// Result file-name template (`{exp}`, `{seed}`, `{zeta}`, wildcards allowed).
    #[serde(default = "default_output_template")]
    pub output_template: String,
    #[serde(default)]
    pub submit: SubmitCommand,

    /// Ground-truth loadings table (`K × J`, tab-separated).
    #[serde(default)]
    pub loadings: Option<PathBuf>,
    /// Reference signature table.
    #[serde(default)]
    pub signatures: Option<PathBuf>,
    #[serde(default = "default_signature_prefix")]
    pub signature_prefix: String,
    /// 1-based signature columns to keep (all when absent).
    #[serde(default)]
    pub signature_indices: Option<Vec<usize>>,
    #[serde(default = "default_substitution_type")]
    pub substitution_type: String,
    /// Original counts for runs on the unmodified data.
    #[serde(default)]
    pub original_counts: Option<PathBuf>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_seed() -> u64 {
    1
}

fn default_perturbed() -> Vec<f64> {
    vec![0.0025]
}

fn default_contamination() -> Vec<f64> {
    vec![2.0]
}

fn default_overdispersed() -> Vec<f64> {
    vec![2.0]
}

fn default_true() -> bool {
    true
}

fn default_zetas() -> Vec<f64> {
    vec![0.1, 0.2, 0.3, 0.4, 0.6, 0.8, 1.0]
}

fn default_chains() -> u64 {
    4
}

fn default_skip() -> usize {
    bps_inference::DEFAULT_SKIP
}

fn default_output_template() -> String {
    "{exp}-zeta{zeta}-seed{seed}-*.json".to_string()
}

fn default_signature_prefix() -> String {
    "Signature".to_string()
}

fn default_substitution_type() -> String {
    "SBS".to_string()
}

pub fn read_experiment_config(path: &Path) -> Result<ExperimentConfig> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("").to_ascii_lowercase();
    let cfg: ExperimentConfig = if ext == "json" {
        serde_json::from_slice(&bytes)?
    } else {
        // Default: YAML (serde_yaml_ng).
        serde_yaml_ng::from_slice(&bytes)?
    };
    cfg.validate()?;
    Ok(cfg)
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.experiment_name.is_empty() {
            bail!("experiment_name must not be empty");
        }
        if self.skip == 0 {
            bail!("skip must be >= 1");
        }
        if self.no_chains == 0 {
            bail!("no_chains must be >= 1");
        }
        if let Some(z) = self.zetas.iter().find(|z| !z.is_finite() || **z <= 0.0) {
            bail!("zetas must be finite and > 0, got {z}");
        }
        self.output_template()?;
        self.substitution_type()?;
        self.catalog().experiments()?;
        Ok(())
    }

    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment_name)
    }

    pub fn paths(&self) -> ExperimentPaths {
        derive_paths(&self.experiment_dir())
    }

    pub fn seeds(&self) -> Vec<u64> {
        (1..=self.no_chains).collect()
    }

    pub fn output_template(&self) -> Result<NameTemplate> {
        Ok(NameTemplate::parse(&self.output_template)?)
    }

    pub fn substitution_type(&self) -> Result<SubstitutionType> {
        Ok(self.substitution_type.parse()?)
    }

    pub fn catalog(&self) -> ExperimentCatalog {
        ExperimentCatalog::new(self.synthetic_data_seed)
            .with_perturbed(self.perturbed.clone())
            .with_contamination(self.contamination.clone())
            .with_overdispersed(self.overdispersed.clone())
            .with_dirichlet(self.dirichlet.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentPaths {
    pub root: PathBuf,
    pub synthetic_data: PathBuf,
    pub results: PathBuf,
    pub figures: PathBuf,
    pub logs: PathBuf,
    pub experiment_scripts: PathBuf,
    pub manifest: PathBuf,
}

pub fn derive_paths(experiment_dir: &Path) -> ExperimentPaths {
    let [synthetic_data, results, figures, logs, experiment_scripts] =
        bps_dispatch::experiment_subdirs(experiment_dir);
    ExperimentPaths {
        root: experiment_dir.to_path_buf(),
        synthetic_data,
        results,
        figures,
        logs,
        experiment_scripts,
        manifest: experiment_dir.join(MANIFEST_FILE),
    }
}

impl ExperimentPaths {
    pub fn create_all(&self) -> Result<()> {
        for dir in [&self.synthetic_data, &self.results, &self.figures, &self.logs, &self.experiment_scripts] {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }
}
