//! Error types for bps

use std::path::PathBuf;

use thiserror::Error;

/// bps error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited-table parsing error
    #[error("table error: {0}")]
    Csv(#[from] csv::Error),

    /// Validation error (shapes, non-finite values, distribution parameters)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fatal configuration error: invalid corruption-model parameter, unknown
    /// variant name, or inconsistent inputs. Raised before any artifact is written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An upstream artifact (loadings, posterior record, summary) is absent.
    #[error("missing upstream artifact: {}", path.display())]
    MissingArtifact {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// Several candidate files match one logical slot; needs offline resolution.
    #[error("ambiguous match for {slot}: {} candidates ({})", candidates.len(), join_paths(candidates))]
    AmbiguousMatch {
        /// Logical slot being resolved (pattern or cell description).
        slot: String,
        /// All matching candidates, sorted.
        candidates: Vec<PathBuf>,
    },

    /// A documented precondition of a computation does not hold.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// The batch-submission command could not be issued.
    #[error("Submission error: {0}")]
    Submission(String),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
