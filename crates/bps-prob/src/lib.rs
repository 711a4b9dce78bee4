//! Probability building blocks for bps.
//!
//! This crate hosts the probability math shared by the generators and the
//! evidence evaluator:
//! - seeded draws (Poisson, Gamma, Dirichlet, negative binomial)
//! - count log-PMFs (Poisson, negative binomial)
//! - small numeric helpers (stable log-sum-exp, robust summaries)

pub mod math;
pub mod neg_binomial;
pub mod poisson;
pub mod sampling;

pub use sampling::{RandomStream, random_stream};
