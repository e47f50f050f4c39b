//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! reimbursement estimator test suite.
//!
//! # Modules
//!
//! - `fixtures`: Fixed identifiers, reference times and labelled corpora
//! - `builders`: Builders for claim and policyholder records
//! - `assertions`: Assertion helpers for probabilities and feature vectors
//! - `generators`: Property-based record generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
