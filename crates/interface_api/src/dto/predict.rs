//! Prediction DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::{ClaimId, PolicyholderId};
use domain_estimation::{Estimation, ReimbursementRequest};
use domain_features::ReimbursementClass;

use crate::error::ApiError;

/// Body of `POST /predict`
///
/// Identifiers arrive as strings so that a malformed id is reported as a
/// validation error naming the field rather than a generic JSON error.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    #[serde(alias = "medical_bulletin_id", alias = "medicalBulletinId")]
    #[validate(length(min = 1, max = 64))]
    pub claim_id: String,
    #[serde(alias = "client_id", alias = "clientId")]
    #[validate(length(min = 1, max = 64))]
    pub policyholder_id: String,
}

impl PredictRequest {
    /// # Errors
    ///
    /// `ApiError::Validation` naming the first unusable field
    pub fn into_request(self) -> Result<ReimbursementRequest, ApiError> {
        self.validate()
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        let claim_id = ClaimId::parse(&self.claim_id)
            .map_err(|e| ApiError::Validation(format!("claimId: {}", e)))?;
        let policyholder_id = PolicyholderId::parse(&self.policyholder_id)
            .map_err(|e| ApiError::Validation(format!("policyholderId: {}", e)))?;
        Ok(ReimbursementRequest::new(claim_id, policyholder_id))
    }
}

/// Body returned by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    pub reimbursement_class: ReimbursementClass,
    pub confidence: f64,
    pub reimbursement_amount: f64,
    pub model_version: String,
}

impl From<Estimation> for PredictResponse {
    fn from(estimation: Estimation) -> Self {
        Self {
            reimbursement_class: estimation.reimbursement_class,
            confidence: estimation.confidence,
            reimbursement_amount: estimation.reimbursement_amount,
            model_version: estimation.model_version,
        }
    }
}
