//! Estimation records and requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{ClaimId, EstimationId, PolicyholderId};
use domain_features::ReimbursementClass;

/// A request to estimate reimbursement for one claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReimbursementRequest {
    pub claim_id: ClaimId,
    /// Must match the policyholder the claim was filed for
    pub policyholder_id: PolicyholderId,
}

impl ReimbursementRequest {
    pub fn new(claim_id: ClaimId, policyholder_id: PolicyholderId) -> Self {
        Self {
            claim_id,
            policyholder_id,
        }
    }
}

/// The stored estimate for a claim
///
/// At most one exists per claim; once stored it is never recomputed or
/// changed, even after the model is retrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimation {
    pub id: EstimationId,
    pub claim_id: ClaimId,
    pub policyholder_id: PolicyholderId,
    pub reimbursement_class: ReimbursementClass,
    /// Calibrated probability of `reimbursement_class`, in (0, 1]
    pub confidence: f64,
    pub reimbursement_amount: f64,
    /// Version of the model that produced the estimate
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}
