//! # bps-core
//!
//! Core types, traits, and error handling for bps.
//!
//! This crate provides:
//! - Common error types
//! - The shared data model (signatures, loadings, counts, posterior records)
//! - Corruption-model variants, artifact name templates and result harvesting
//! - Core traits (EvidenceModel, RunRecordStore)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod harvest;
pub mod io;
pub mod model;
pub mod record;
pub mod template;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use harvest::{has_wildcard, locate_unique, matching_files};
pub use io::write_atomic;
pub use model::{CorruptionModel, Dispersion, format_param};
pub use record::{Array3, PosteriorRunRecord};
pub use template::{NameFields, NameTemplate};
pub use traits::{EvidenceEstimate, EvidenceModel, RunRecordStore};
pub use types::{
    CountMatrix, LoadingsMatrix, SIGNATURE_FLOOR, SignatureSet, SubstitutionType, expected_rates,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
