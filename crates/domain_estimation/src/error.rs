//! Estimation and retraining errors

use thiserror::Error;

use core_kernel::{ClaimId, PolicyholderId, PortError};
use domain_features::FeatureExtractionError;
use domain_model::{ModelError, TrainingError};

/// Broad failure categories, used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source records lack a required group
    Structural,
    /// The request itself is inconsistent
    Validation,
    NotFound,
    /// Inference produced unusable numbers
    Computation,
    /// A store or other dependency failed
    Infrastructure,
}

/// Errors returned by [`crate::EstimationService::estimate`]
#[derive(Debug, Error)]
pub enum EstimationError {
    #[error(transparent)]
    Structural(#[from] FeatureExtractionError),

    #[error("Claim {claim_id} belongs to policyholder {owner}, not {requested}")]
    PolicyholderMismatch {
        claim_id: ClaimId,
        owner: PolicyholderId,
        requested: PolicyholderId,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Estimation failed: {0}")]
    Computation(#[from] ModelError),

    #[error("Storage error: {0}")]
    Infrastructure(PortError),
}

impl EstimationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EstimationError::Structural(_) => ErrorKind::Structural,
            EstimationError::PolicyholderMismatch { .. } => ErrorKind::Validation,
            EstimationError::NotFound { .. } => ErrorKind::NotFound,
            EstimationError::Computation(_) => ErrorKind::Computation,
            EstimationError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<PortError> for EstimationError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound { entity_type, id } => EstimationError::NotFound {
                entity: entity_type,
                id,
            },
            other => EstimationError::Infrastructure(other),
        }
    }
}

/// Errors from a retraining attempt; none of them affect the served model
#[derive(Debug, Error)]
pub enum RetrainError {
    #[error("Failed to load training data: {0}")]
    Source(#[from] PortError),

    #[error("Training failed: {0}")]
    Training(#[from] TrainingError),

    #[error("Training task did not complete: {0}")]
    Join(String),
}
