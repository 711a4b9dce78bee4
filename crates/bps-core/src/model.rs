//! Corruption models for synthetic count generation.
//!
//! Each experiment variant is a closed [`CorruptionModel`] value carrying only
//! the parameters it needs. Variant labels used in file names and manifests
//! round-trip through [`CorruptionModel::label`] and [`std::str::FromStr`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a Dirichlet-perturbed signature profile is parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Dispersion {
    /// Dirichlet concentration `κ` shared by every signature.
    Concentration(f64),
    /// Target mean cosine error; `κ` is solved per signature.
    MeanError(f64),
}

/// Statistical corruption applied when synthesizing counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum CorruptionModel {
    /// Poisson counts around `Sᵗ·L`.
    Exact,
    /// Per-sample Dirichlet-perturbed signatures, then Poisson.
    Overdispersed {
        /// Perturbation strength.
        dispersion: Dispersion,
    },
    /// Negative-binomial counts with variance `r · mean`; `r = 1` is Poisson.
    NegativeBinomial {
        /// Variance inflation factor `r >= 1`.
        dispersion: f64,
    },
    /// A fraction of each sample's loading is moved to a random error signature.
    Contamination {
        /// Percentage of loading reassigned (0–100).
        percent: f64,
    },
}

impl CorruptionModel {
    /// Check the model's parameters.
    pub fn validate(&self) -> Result<()> {
        match *self {
            CorruptionModel::Exact => Ok(()),
            CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(kappa) } => {
                if kappa.is_nan() || kappa <= 0.0 {
                    return Err(Error::Configuration(format!(
                        "Dirichlet concentration must be > 0, got {kappa}"
                    )));
                }
                Ok(())
            }
            CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(err) } => {
                if !err.is_finite() || err <= 0.0 {
                    return Err(Error::Configuration(format!(
                        "target mean error must be finite and > 0, got {err}"
                    )));
                }
                Ok(())
            }
            CorruptionModel::NegativeBinomial { dispersion } => {
                if !dispersion.is_finite() || dispersion < 1.0 {
                    return Err(Error::Configuration(format!(
                        "overdispersion must be at least 1, got {dispersion}"
                    )));
                }
                Ok(())
            }
            CorruptionModel::Contamination { percent } => {
                if !(0.0..=100.0).contains(&percent) {
                    return Err(Error::Configuration(format!(
                        "contamination must be within 0..=100 percent, got {percent}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Variant label used in experiment identifiers; `None` for the exact model.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            CorruptionModel::Exact => None,
            CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(_) } => {
                Some("perturbed")
            }
            CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(_) } => {
                Some("dirichlet")
            }
            CorruptionModel::NegativeBinomial { .. } => Some("overdispersed"),
            CorruptionModel::Contamination { .. } => Some("contamination"),
        }
    }

    /// The single numeric parameter of the variant, if any.
    pub fn parameter(&self) -> Option<f64> {
        match *self {
            CorruptionModel::Exact => None,
            CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(v) }
            | CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(v) }
            | CorruptionModel::NegativeBinomial { dispersion: v }
            | CorruptionModel::Contamination { percent: v } => Some(v),
        }
    }

    /// Suffix appended after `-seed-{seed}`: empty for exact, `-{label}-{param}` otherwise.
    pub fn suffix(&self) -> String {
        match (self.label(), self.parameter()) {
            (Some(label), Some(p)) => format!("-{label}-{}", format_param(p)),
            _ => String::new(),
        }
    }

    /// Experiment identifier `{seed}` or `{seed}-{label}-{param}`.
    pub fn experiment_id(&self, seed: u64) -> String {
        format!("{seed}{}", self.suffix())
    }

    /// Parse an experiment identifier back into `(seed, model)`.
    pub fn parse_experiment_id(id: &str) -> Result<(u64, Self)> {
        let (seed_part, rest) = match id.split_once('-') {
            Some((s, r)) => (s, Some(r)),
            None => (id, None),
        };
        let seed = seed_part.parse::<u64>().map_err(|_| {
            Error::Configuration(format!("experiment id '{id}' does not start with a seed"))
        })?;
        let model = match rest {
            None => CorruptionModel::Exact,
            Some(r) => r.parse()?,
        };
        Ok((seed, model))
    }
}

impl fmt::Display for CorruptionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.label(), self.parameter()) {
            (Some(label), Some(p)) => write!(f, "{label}-{}", format_param(p)),
            _ => write!(f, "correct"),
        }
    }
}

impl std::str::FromStr for CorruptionModel {
    type Err = Error;

    /// Accepts `correct`/`exact` or `{label}-{param}`.
    fn from_str(s: &str) -> Result<Self> {
        if s == "correct" || s == "exact" {
            return Ok(CorruptionModel::Exact);
        }
        let (label, param) = s.split_once('-').ok_or_else(|| {
            Error::Configuration(format!("variant '{s}' is not of the form label-parameter"))
        })?;
        let value: f64 = param.parse().map_err(|_| {
            Error::Configuration(format!("variant '{s}' has a non-numeric parameter '{param}'"))
        })?;
        let model = match label {
            "perturbed" => {
                CorruptionModel::Overdispersed { dispersion: Dispersion::MeanError(value) }
            }
            "dirichlet" => {
                CorruptionModel::Overdispersed { dispersion: Dispersion::Concentration(value) }
            }
            "overdispersed" | "negbin" => CorruptionModel::NegativeBinomial { dispersion: value },
            "contamination" | "errorsig" => CorruptionModel::Contamination { percent: value },
            other => {
                return Err(Error::Configuration(format!("unknown corruption variant '{other}'")));
            }
        };
        model.validate()?;
        Ok(model)
    }
}

/// Format a variant parameter for identifiers: integral values keep one
/// decimal (`2.0`), others use the shortest round-trip form (`0.0025`).
pub fn format_param(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}
