//! Feature extraction errors

use std::fmt;

use thiserror::Error;

/// Which source record an extraction problem was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Claim,
    Policyholder,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Claim => write!(f, "claim"),
            RecordKind::Policyholder => write!(f, "policyholder"),
        }
    }
}

/// Errors raised while turning records into a feature vector
///
/// `MissingGroup` is structural and aborts the extraction. `InvalidField`
/// never aborts: it is reported alongside the vector when a field fell back
/// to its default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureExtractionError {
    #[error("{record} {id} is missing required group '{group}'")]
    MissingGroup {
        record: RecordKind,
        id: String,
        group: &'static str,
    },

    #[error("{record} {id} has unusable value {value} for '{field}'")]
    InvalidField {
        record: RecordKind,
        id: String,
        field: &'static str,
        value: String,
    },
}

impl FeatureExtractionError {
    pub fn missing_group(record: RecordKind, id: impl fmt::Display, group: &'static str) -> Self {
        FeatureExtractionError::MissingGroup {
            record,
            id: id.to_string(),
            group,
        }
    }

    pub fn invalid_field(
        record: RecordKind,
        id: impl fmt::Display,
        field: &'static str,
        value: &serde_json::Value,
    ) -> Self {
        FeatureExtractionError::InvalidField {
            record,
            id: id.to_string(),
            field,
            value: value.to_string(),
        }
    }

    /// True when the record shape itself is wrong
    pub fn is_structural(&self) -> bool {
        matches!(self, FeatureExtractionError::MissingGroup { .. })
    }

    /// Name of the group or field the error points at
    pub fn location(&self) -> &'static str {
        match self {
            FeatureExtractionError::MissingGroup { group, .. } => group,
            FeatureExtractionError::InvalidField { field, .. } => field,
        }
    }
}
