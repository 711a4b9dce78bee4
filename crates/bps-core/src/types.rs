//! Common data types for bps
//!
//! Matrices follow the orientation used throughout the pipeline:
//! signatures are `K × I` (signature × channel), loadings are `K × J`
//! (signature × sample), and counts are `I × J` (channel × sample).

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Floor applied to non-positive signature entries so every downstream rate
/// stays strictly positive.
pub const SIGNATURE_FLOOR: f64 = 1e-10;

/// Mutation class of a catalog; fixes the number of channels `I`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubstitutionType {
    /// Single-base substitutions (96 trinucleotide channels).
    Sbs,
    /// Doublet-base substitutions (78 channels).
    Dbs,
    /// Small insertions and deletions (83 channels).
    Indel,
}

impl SubstitutionType {
    /// Number of mutation channels for this class.
    pub fn n_channels(self) -> usize {
        match self {
            SubstitutionType::Sbs => 96,
            SubstitutionType::Dbs => 78,
            SubstitutionType::Indel => 83,
        }
    }

    /// Channel labels in canonical order.
    ///
    /// SBS labels are `5'[REF>ALT]3'` ordered by substitution, then 5' base,
    /// then 3' base. The other classes use their positional index.
    pub fn channel_labels(self) -> Vec<String> {
        match self {
            SubstitutionType::Sbs => {
                const SUBS: [&str; 6] = ["C>A", "C>G", "C>T", "T>A", "T>C", "T>G"];
                const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
                let mut out = Vec::with_capacity(96);
                for sub in SUBS {
                    for five in BASES {
                        for three in BASES {
                            out.push(format!("{five}[{sub}]{three}"));
                        }
                    }
                }
                out
            }
            other => (0..other.n_channels()).map(|i| i.to_string()).collect(),
        }
    }
}

impl std::str::FromStr for SubstitutionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SBS" => Ok(SubstitutionType::Sbs),
            "DBS" => Ok(SubstitutionType::Dbs),
            "INDEL" | "ID" => Ok(SubstitutionType::Indel),
            other => Err(Error::Configuration(format!(
                "unknown substitution type '{other}' (expected SBS, DBS or INDEL)"
            ))),
        }
    }
}

/// `K × I` reference signatures; each row is a distribution over channels.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureSet {
    names: Vec<String>,
    matrix: DMatrix<f64>,
}

impl SignatureSet {
    /// Build a signature set, flooring non-positive entries at [`SIGNATURE_FLOOR`]
    /// and renormalizing every row to sum to one.
    pub fn new(names: Vec<String>, matrix: DMatrix<f64>) -> Result<Self> {
        if names.len() != matrix.nrows() {
            return Err(Error::Validation(format!(
                "signature names ({}) do not match signature rows ({})",
                names.len(),
                matrix.nrows()
            )));
        }
        if matrix.nrows() == 0 || matrix.ncols() == 0 {
            return Err(Error::Validation("signature matrix must be non-empty".to_string()));
        }
        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(Error::Validation("signature matrix contains non-finite values".into()));
        }

        let mut matrix = matrix;
        matrix.iter_mut().filter(|v| **v <= 0.0).for_each(|v| *v = SIGNATURE_FLOOR);
        for mut row in matrix.row_iter_mut() {
            let total: f64 = row.iter().sum();
            row /= total;
        }
        Ok(Self { names, matrix })
    }

    /// Build from row vectors (one per signature).
    pub fn from_rows(names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_channels = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != n_channels) {
            return Err(Error::Validation("signature rows have unequal lengths".to_string()));
        }
        let matrix = DMatrix::from_fn(rows.len(), n_channels, |k, i| rows[k][i]);
        Self::new(names, matrix)
    }

    /// Number of signatures `K`.
    pub fn n_signatures(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of channels `I`.
    pub fn n_channels(&self) -> usize {
        self.matrix.ncols()
    }

    /// Signature identifiers, in row order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The underlying `K × I` matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Copy of signature `k` as a dense profile.
    pub fn profile(&self, k: usize) -> Vec<f64> {
        self.matrix.row(k).iter().copied().collect()
    }

    /// Keep only the given rows (0-based), in the given order.
    pub fn select(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&bad) = rows.iter().find(|&&k| k >= self.n_signatures()) {
            return Err(Error::Configuration(format!(
                "signature index {} out of range (K = {})",
                bad + 1,
                self.n_signatures()
            )));
        }
        let matrix = self.matrix.select_rows(rows);
        let names = rows.iter().map(|&k| self.names[k].clone()).collect();
        Ok(Self { names, matrix })
    }
}

/// `K × J` non-negative exposures of each sample to each signature.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadingsMatrix {
    matrix: DMatrix<f64>,
}

impl LoadingsMatrix {
    /// Wrap a `K × J` matrix after checking it is finite and non-negative.
    pub fn new(matrix: DMatrix<f64>) -> Result<Self> {
        if matrix.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::Validation(
                "loadings must be finite and non-negative".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    /// Build from row vectors (one per signature).
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let n_samples = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != n_samples) {
            return Err(Error::Validation("loadings rows have unequal lengths".to_string()));
        }
        Self::new(DMatrix::from_fn(rows.len(), n_samples, |k, j| rows[k][j]))
    }

    /// Number of signatures `K`.
    pub fn n_signatures(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of samples `J`.
    pub fn n_samples(&self) -> usize {
        self.matrix.ncols()
    }

    /// The underlying `K × J` matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Loading vector of sample `j` across all signatures.
    pub fn sample(&self, j: usize) -> Vec<f64> {
        self.matrix.column(j).iter().copied().collect()
    }

    /// Total loading of sample `j`.
    pub fn sample_total(&self, j: usize) -> f64 {
        self.matrix.column(j).sum()
    }

    /// Total loading of signature `k` across samples.
    pub fn signature_total(&self, k: usize) -> f64 {
        self.matrix.row(k).sum()
    }

    /// Sum of every entry.
    pub fn grand_total(&self) -> f64 {
        self.matrix.sum()
    }

    /// Keep only the given signature rows (0-based), in the given order.
    pub fn select_signatures(&self, rows: &[usize]) -> Result<Self> {
        if let Some(&bad) = rows.iter().find(|&&k| k >= self.n_signatures()) {
            return Err(Error::Validation(format!(
                "loadings row {bad} out of range (K = {})",
                self.n_signatures()
            )));
        }
        Ok(Self { matrix: self.matrix.select_rows(rows) })
    }
}

/// Expected count matrix `Sᵗ·L` (`I × J`).
///
/// Fails with a configuration error when `K` differs between the inputs.
pub fn expected_rates(loadings: &LoadingsMatrix, signatures: &SignatureSet) -> Result<DMatrix<f64>> {
    if loadings.n_signatures() != signatures.n_signatures() {
        return Err(Error::Configuration(format!(
            "loadings have K = {} but signatures have K = {}",
            loadings.n_signatures(),
            signatures.n_signatures()
        )));
    }
    Ok(signatures.matrix().transpose() * loadings.matrix())
}

/// `I × J` integer count matrix indexed by channel label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountMatrix {
    channels: Vec<String>,
    samples: Vec<String>,
    /// Row-major `I × J`.
    data: Vec<u64>,
}

impl CountMatrix {
    /// Create from labels and row-major data.
    pub fn new(channels: Vec<String>, samples: Vec<String>, data: Vec<u64>) -> Result<Self> {
        if data.len() != channels.len() * samples.len() {
            return Err(Error::Validation(format!(
                "count data has {} entries, expected {} × {}",
                data.len(),
                channels.len(),
                samples.len()
            )));
        }
        Ok(Self { channels, samples, data })
    }

    /// All-zero matrix with positional sample labels.
    pub fn zeros(channels: Vec<String>, n_samples: usize) -> Self {
        let data = vec![0; channels.len() * n_samples];
        let samples = (0..n_samples).map(|j| j.to_string()).collect();
        Self { channels, samples, data }
    }

    /// Number of channels `I`.
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples `J`.
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    /// Channel labels.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Sample labels.
    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    /// Count at channel `i`, sample `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> u64 {
        self.data[i * self.samples.len() + j]
    }

    /// Set the count at channel `i`, sample `j`.
    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: u64) {
        let n = self.samples.len();
        self.data[i * n + j] = value;
    }

    /// Counts of channel `i` across samples.
    pub fn row(&self, i: usize) -> &[u64] {
        let n = self.samples.len();
        &self.data[i * n..(i + 1) * n]
    }

    /// Mean count across all cells.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&c| c as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Total mutations in sample `j`.
    pub fn sample_total(&self, j: usize) -> u64 {
        (0..self.n_channels()).map(|i| self.get(i, j)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sbs_labels() {
        let labels = SubstitutionType::Sbs.channel_labels();
        assert_eq!(labels.len(), 96);
        assert_eq!(labels[0], "A[C>A]A");
        assert_eq!(labels[95], "T[T>G]T");
        assert_eq!(SubstitutionType::Dbs.channel_labels().len(), 78);
        assert_eq!(SubstitutionType::Indel.n_channels(), 83);
    }

    #[test]
    fn test_substitution_type_parse() {
        assert_eq!("sbs".parse::<SubstitutionType>().unwrap(), SubstitutionType::Sbs);
        assert!("XYZ".parse::<SubstitutionType>().is_err());
    }

    #[test]
    fn test_signature_floor_and_normalize() {
        let sigs = SignatureSet::from_rows(
            vec!["A".into(), "B".into()],
            &[vec![0.5, 0.5, 0.0], vec![2.0, -1.0, 2.0]],
        )
        .unwrap();
        for k in 0..2 {
            assert_relative_eq!(sigs.matrix().row(k).sum(), 1.0, epsilon = 1e-12);
            assert!(sigs.matrix().row(k).iter().all(|&v| v > 0.0));
        }
        assert_relative_eq!(sigs.matrix()[(1, 0)], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_signature_select_out_of_range() {
        let sigs = SignatureSet::from_rows(vec!["A".into()], &[vec![1.0, 1.0]]).unwrap();
        assert!(matches!(sigs.select(&[1]), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_loadings_rejects_negative() {
        assert!(LoadingsMatrix::from_rows(&[vec![1.0, -2.0]]).is_err());
    }

    #[test]
    fn test_expected_rates_shape_and_mismatch() {
        let sigs = SignatureSet::from_rows(
            vec!["A".into(), "B".into()],
            &[vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]],
        )
        .unwrap();
        let loadings = LoadingsMatrix::from_rows(&[vec![10.0, 0.0], vec![0.0, 20.0]]).unwrap();
        let m = expected_rates(&loadings, &sigs).unwrap();
        assert_eq!(m.shape(), (3, 2));
        assert_relative_eq!(m[(0, 0)], 10.0, epsilon = 1e-6);
        assert_relative_eq!(m[(2, 1)], 20.0, epsilon = 1e-6);

        let bad = LoadingsMatrix::from_rows(&[vec![1.0]]).unwrap();
        assert!(matches!(expected_rates(&bad, &sigs), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_count_matrix_accessors() {
        let mut c = CountMatrix::zeros(vec!["x".into(), "y".into()], 3);
        c.set(1, 2, 7);
        assert_eq!(c.get(1, 2), 7);
        assert_eq!(c.row(1), &[0, 0, 7]);
        assert_eq!(c.sample_total(2), 7);
    }
}
