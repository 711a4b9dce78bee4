//! Evidence summaries: the per-zeta evaluation archive.
//!
//! A summary stores parallel arrays indexed by zeta (`best_seed`,
//! `log_evidence`, `k`, `runtime`) plus the per-seed table behind them.
//! Missing runs make `-inf`/`NaN` legitimate values, which JSON cannot carry
//! as numbers; they are written as the strings `"-inf"`, `"inf"`, `"NaN"`.

use std::path::Path;

use bps_core::{Error, Result, write_atomic};
use serde::{Deserialize, Serialize};

/// Current schema version of the summary archive.
pub const SCHEMA_VERSION: &str = "1.0.0";

pub(crate) mod json_float {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(f64),
        Tag(String),
    }

    fn to_repr(v: f64) -> Repr {
        if v.is_finite() {
            Repr::Num(v)
        } else if v.is_nan() {
            Repr::Tag("NaN".to_string())
        } else if v > 0.0 {
            Repr::Tag("inf".to_string())
        } else {
            Repr::Tag("-inf".to_string())
        }
    }

    fn from_repr<E: serde::de::Error>(r: Repr) -> Result<f64, E> {
        match r {
            Repr::Num(v) => Ok(v),
            Repr::Tag(s) => match s.as_str() {
                "NaN" | "nan" => Ok(f64::NAN),
                "inf" | "Infinity" => Ok(f64::INFINITY),
                "-inf" | "-Infinity" => Ok(f64::NEG_INFINITY),
                other => Err(E::custom(format!("invalid float '{other}'"))),
            },
        }
    }

    pub fn serialize<S: Serializer>(v: &f64, s: S) -> Result<S::Ok, S::Error> {
        to_repr(*v).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        from_repr(Repr::deserialize(d)?)
    }

    pub mod vec {
        use super::*;

        pub fn serialize<S: Serializer>(v: &[f64], s: S) -> Result<S::Ok, S::Error> {
            s.collect_seq(v.iter().map(|x| to_repr(*x)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
            Vec::<Repr>::deserialize(d)?.into_iter().map(from_repr::<D::Error>).collect()
        }
    }
}

/// Evaluation of one `(zeta, seed)` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedEvaluation {
    /// Sampler seed.
    pub seed: u64,
    /// Whether the run record was found and scored.
    pub available: bool,
    /// Log marginal likelihood (`-inf` when missing).
    #[serde(with = "json_float")]
    pub log_evidence: f64,
    /// Standard error of the log-likelihood mean (0 when missing).
    #[serde(with = "json_float")]
    pub std_error: f64,
    /// Mean log-likelihood of the thinned draws (`-inf` when missing).
    #[serde(with = "json_float")]
    pub expected_log_likelihood: f64,
    /// Inferred number of active signatures (`NaN` when missing).
    #[serde(with = "json_float")]
    pub k: f64,
    /// Sampler runtime in seconds (`NaN` when missing).
    #[serde(with = "json_float")]
    pub runtime: f64,
}

impl SeedEvaluation {
    /// Placeholder for a run with no usable record.
    pub fn missing(seed: u64) -> Self {
        Self {
            seed,
            available: false,
            log_evidence: f64::NEG_INFINITY,
            std_error: 0.0,
            expected_log_likelihood: f64::NEG_INFINITY,
            k: f64::NAN,
            runtime: f64::NAN,
        }
    }
}

/// Best-seed evaluation for one zeta.
#[derive(Debug, Clone, PartialEq)]
pub struct ZetaEvaluation {
    /// Tempering exponent.
    pub zeta: f64,
    /// Seed with the highest evidence (earliest on ties); `None` without seeds.
    pub best_seed: Option<u64>,
    /// Evidence of the best seed.
    pub log_evidence: f64,
    /// `K` of the best seed.
    pub k: f64,
    /// Mean runtime over available seeds.
    pub runtime: f64,
    /// Every seed, in scan order.
    pub seeds: Vec<SeedEvaluation>,
}

/// Per-zeta evaluation archive for one experiment variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    /// Schema version for forward compatibility.
    pub schema_version: String,
    /// Experiment name.
    pub experiment: String,
    /// Experiment variant identifier.
    pub variant: String,
    /// Thinning factor used.
    pub skip: usize,
    /// Zeta values, in evaluation order.
    pub zetas: Vec<f64>,
    /// Best seed per zeta.
    pub best_seed: Vec<Option<u64>>,
    /// Best evidence per zeta.
    #[serde(with = "json_float::vec")]
    pub log_evidence: Vec<f64>,
    /// `K` of the best seed per zeta.
    #[serde(rename = "K", with = "json_float::vec")]
    pub k: Vec<f64>,
    /// Mean runtime per zeta.
    #[serde(with = "json_float::vec")]
    pub runtime: Vec<f64>,
    /// Per-seed table per zeta.
    pub seeds: Vec<Vec<SeedEvaluation>>,
}

impl EvidenceSummary {
    /// Assemble the archive from per-zeta evaluations.
    pub fn from_evaluations(
        experiment: &str,
        variant: &str,
        skip: usize,
        evaluations: Vec<ZetaEvaluation>,
    ) -> Self {
        let mut out = Self {
            schema_version: SCHEMA_VERSION.to_string(),
            experiment: experiment.to_string(),
            variant: variant.to_string(),
            skip,
            zetas: Vec::with_capacity(evaluations.len()),
            best_seed: Vec::with_capacity(evaluations.len()),
            log_evidence: Vec::with_capacity(evaluations.len()),
            k: Vec::with_capacity(evaluations.len()),
            runtime: Vec::with_capacity(evaluations.len()),
            seeds: Vec::with_capacity(evaluations.len()),
        };
        for e in evaluations {
            out.zetas.push(e.zeta);
            out.best_seed.push(e.best_seed);
            out.log_evidence.push(e.log_evidence);
            out.k.push(e.k);
            out.runtime.push(e.runtime);
            out.seeds.push(e.seeds);
        }
        out
    }

    /// Number of zetas.
    pub fn len(&self) -> usize {
        self.zetas.len()
    }

    /// `true` without any zeta.
    pub fn is_empty(&self) -> bool {
        self.zetas.is_empty()
    }

    /// Keep only zetas with at least one usable run (`K` not `NaN`).
    pub fn valid(&self) -> Self {
        let keep: Vec<usize> = (0..self.len()).filter(|&i| !self.k[i].is_nan()).collect();
        let dropped: Vec<f64> =
            (0..self.len()).filter(|i| !keep.contains(i)).map(|i| self.zetas[i]).collect();
        if !dropped.is_empty() {
            tracing::warn!(?dropped, variant = %self.variant, "dropping zetas without valid runs");
        }
        let pick = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
        Self {
            schema_version: self.schema_version.clone(),
            experiment: self.experiment.clone(),
            variant: self.variant.clone(),
            skip: self.skip,
            zetas: pick(&self.zetas),
            best_seed: keep.iter().map(|&i| self.best_seed[i]).collect(),
            log_evidence: pick(&self.log_evidence),
            k: pick(&self.k),
            runtime: pick(&self.runtime),
            seeds: keep.iter().map(|&i| self.seeds[i].clone()).collect(),
        }
    }

    /// Read a summary archive.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingArtifact { path: path.to_path_buf() });
        }
        let summary: Self = serde_json::from_slice(&std::fs::read(path)?)?;
        let n = summary.zetas.len();
        if [summary.best_seed.len(), summary.log_evidence.len(), summary.k.len(), summary.runtime.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(Error::Validation(format!(
                "summary {} has arrays of unequal length",
                path.display()
            )));
        }
        Ok(summary)
    }

    /// Write the archive via a temp file and rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &serde_json::to_vec_pretty(self)?)
    }
}

/// Summary file name for an experiment variant.
pub fn summary_file_name(experiment: &str, variant: &str) -> String {
    if variant.is_empty() {
        format!("{experiment}-summary.json")
    } else {
        format!("{experiment}-{variant}-summary.json")
    }
}
