//! Feature Domain
//!
//! Source records arrive from the claim-intake system as loosely typed
//! documents: numbers may be strings, groups may be missing, dates may or may
//! not carry an offset. This crate turns one claim record plus its
//! policyholder record into the fixed 12-element vector the model consumes.
//!
//! # Error policy
//!
//! ```text
//! missing group (treatmentDetails, financialInfo, health, plan) -> Err(MissingGroup)
//! malformed field value                                         -> default + InvalidField report
//! ```

pub mod coerce;
pub mod error;
pub mod extractor;
pub mod label;
pub mod records;
pub mod vector;

pub use error::{FeatureExtractionError, RecordKind};
pub use extractor::{ExtractionConfig, Extraction, FeatureExtractor, parse_duration_months, severity_bucket};
pub use label::ReimbursementClass;
pub use records::{
    ClaimRecord, TreatmentDetails, FinancialInfo,
    PolicyholderRecord, HealthInfo, PlanInfo, PlanRange,
};
pub use vector::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
