//! Posterior run records produced by the external sampler.
//!
//! A record holds three-axis posterior draws with the draw axis last, so
//! every `(a, b)` lane of draws is contiguous.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::CountMatrix;
use crate::{Error, Result};

/// Dense row-major three-axis array of `f64`.
///
/// Deserialization goes through [`Array3::new`], so a record whose `data`
/// does not fill its `shape` is rejected at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Array3Raw")]
pub struct Array3 {
    shape: [usize; 3],
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct Array3Raw {
    shape: [usize; 3],
    data: Vec<f64>,
}

impl TryFrom<Array3Raw> for Array3 {
    type Error = Error;

    fn try_from(raw: Array3Raw) -> Result<Self> {
        Array3::new(raw.shape, raw.data)
    }
}

impl Array3 {
    /// Wrap row-major data of the given shape.
    pub fn new(shape: [usize; 3], data: Vec<f64>) -> Result<Self> {
        let expected = shape.iter().product::<usize>();
        if data.len() != expected {
            return Err(Error::Validation(format!(
                "array of shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Array filled by `f(a, b, c)`.
    pub fn from_fn(shape: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> f64) -> Self {
        let mut data = Vec::with_capacity(shape.iter().product());
        for a in 0..shape[0] {
            for b in 0..shape[1] {
                for c in 0..shape[2] {
                    data.push(f(a, b, c));
                }
            }
        }
        Self { shape, data }
    }

    /// Shape `[axis0, axis1, draws]`.
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Length of the last (draw) axis.
    pub fn n_draws(&self) -> usize {
        self.shape[2]
    }

    /// Element at `(a, b, c)`.
    #[inline]
    pub fn get(&self, a: usize, b: usize, c: usize) -> f64 {
        self.data[(a * self.shape[1] + b) * self.shape[2] + c]
    }

    /// Contiguous draws of the `(a, b)` lane.
    pub fn lane(&self, a: usize, b: usize) -> &[f64] {
        let n = self.shape[2];
        let start = (a * self.shape[1] + b) * n;
        &self.data[start..start + n]
    }

    /// Keep draws `start, start + step, ...` (the `[:, :, start::step]` slice).
    pub fn thin(&self, start: usize, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(Error::Validation("thinning step must be >= 1".to_string()));
        }
        let kept: Vec<usize> = (start..self.shape[2]).step_by(step).collect();
        let shape = [self.shape[0], self.shape[1], kept.len()];
        Ok(Self::from_fn(shape, |a, b, c| self.get(a, b, kept[c])))
    }
}

/// One sampler run for a `(zeta, seed)` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorRunRecord {
    /// Loadings draws, `K × J × S`.
    pub loadings: Array3,
    /// Signature draws, `K × I × S`.
    pub signatures: Array3,
    /// Expected-loading draws, `R × K × S` (signature on the middle axis).
    pub expected_loadings: Array3,
    /// Wall-clock sampling time in seconds.
    pub runtime: f64,
    /// Sampler hyperparameters (`a`, `alpha`, `zeta`, `J0`, ...).
    #[serde(default)]
    pub hyperparameters: BTreeMap<String, f64>,
    /// Counts the run was fit on, when the sampler stored them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counts: Option<CountMatrix>,
}

impl PosteriorRunRecord {
    /// Check that the three arrays agree on `K` and draw count.
    pub fn validate(&self) -> Result<()> {
        let [k_l, _, s_l] = self.loadings.shape();
        let [k_s, _, s_s] = self.signatures.shape();
        let [_, k_e, s_e] = self.expected_loadings.shape();
        if k_l != k_s || k_l != k_e {
            return Err(Error::Validation(format!(
                "posterior arrays disagree on K: loadings {k_l}, signatures {k_s}, expected loadings {k_e}"
            )));
        }
        if s_l != s_s || s_l != s_e {
            return Err(Error::Validation(format!(
                "posterior arrays disagree on draw count: {s_l}, {s_s}, {s_e}"
            )));
        }
        Ok(())
    }
}
