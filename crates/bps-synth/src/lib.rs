//! # bps-synth
//!
//! Synthetic mutation-count data for signature-evaluation experiments.
//!
//! - [`NoiseModelGenerator`]: counts from ground truth under the exact,
//!   overdispersed, negative-binomial and contamination models
//! - [`ExperimentCatalog`]: the ordered list of data variants and its manifest
//! - [`GroundTruthSummary`]: trimmed ground-truth loadings
//! - [`io`]: TSV/CSV readers and writers for every artifact above

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod generator;
pub mod io;
pub mod trim;

pub use catalog::{
    Experiment, ExperimentCatalog, data_file_name, ground_truth_file_name, read_manifest,
};
pub use generator::{
    NoiseModelGenerator, concentration_for_mean_error, contaminated_loadings, signature_sparsity,
};
pub use trim::{GroundTruthEntry, GroundTruthSummary, retained_signatures};
