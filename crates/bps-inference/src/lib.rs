//! # bps-inference
//!
//! Model selection over tempered posterior runs.
//!
//! This crate provides:
//! - Posterior run records on disk and a template-driven record store
//! - Poisson-NMF evidence (harmonic-mean log marginal likelihood) and `K`
//! - Per-zeta best-seed evaluation with a resumable summary cache
//! - Finite-difference diagnostics of the evidence curves
//!
//! ## Architecture
//!
//! The evaluator depends on the `EvidenceModel` and `RunRecordStore` traits
//! from bps-core, not on a concrete likelihood or storage layout.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Finite-difference diagnostics of evidence curves.
pub mod diagnostics;
/// Per-zeta evidence evaluation and the summary cache.
pub mod evaluator;
/// Poisson-NMF evidence model and `K` estimation.
pub mod evidence;
/// Run-record files and the template-driven store.
pub mod posterior;
/// Evidence summary archive.
pub mod summary;

pub use diagnostics::{CurveDiagnostics, ZetaDiagnostics};
pub use evaluator::{DEFAULT_SKIP, RunEvidenceEvaluator};
pub use evidence::{ACTIVITY_CUTOFF, PoissonNmfEvidence, expected_k};
pub use posterior::{FileRecordStore, read_run_record, write_run_record};
pub use summary::{EvidenceSummary, SeedEvaluation, ZetaEvaluation, summary_file_name};
