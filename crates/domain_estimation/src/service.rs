//! Cached reimbursement estimation

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use core_kernel::EstimationId;
use domain_features::coerce::as_number;
use domain_features::FeatureExtractor;
use domain_model::calibration::reimbursement_amount;

use crate::error::EstimationError;
use crate::estimation::{Estimation, ReimbursementRequest};
use crate::handle::ModelHandle;
use crate::ports::{EstimationStore, RecordStore};

/// Produces at most one estimate per claim
///
/// The first successful request for a claim computes and stores the
/// estimate; every later request returns the stored record unchanged, even
/// if the model has been retrained since.
#[derive(Clone)]
pub struct EstimationService {
    records: Arc<dyn RecordStore>,
    estimations: Arc<dyn EstimationStore>,
    model: ModelHandle,
    extractor: FeatureExtractor,
}

impl EstimationService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        estimations: Arc<dyn EstimationStore>,
        model: ModelHandle,
        extractor: FeatureExtractor,
    ) -> Self {
        Self {
            records,
            estimations,
            model,
            extractor,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// Returns the estimate for a claim, computing it on first request
    ///
    /// # Errors
    ///
    /// - `NotFound` when the claim or policyholder does not exist
    /// - `PolicyholderMismatch` when the claim belongs to someone else
    /// - `Structural` when a record lacks a required group
    /// - `Computation` when the model output is not finite
    /// - `Infrastructure` when a store fails
    #[instrument(skip(self), fields(claim_id = %request.claim_id))]
    pub async fn estimate(&self, request: ReimbursementRequest) -> Result<Estimation, EstimationError> {
        if let Some(existing) = self.estimations.find_by_claim(request.claim_id).await? {
            debug!(model_version = %existing.model_version, "Returning stored estimate");
            return Ok(existing);
        }

        let claim = self.records.get_claim(request.claim_id).await?;
        let holder = self.records.get_policyholder(request.policyholder_id).await?;
        if claim.policyholder_id != request.policyholder_id {
            warn!(owner = %claim.policyholder_id, requested = %request.policyholder_id, "Policyholder does not own claim");
            return Err(EstimationError::PolicyholderMismatch {
                claim_id: claim.id,
                owner: claim.policyholder_id,
                requested: request.policyholder_id,
            });
        }

        let snapshot = self.model.load();
        let extraction = self.extractor.extract(&claim, &holder)?;
        if !extraction.is_clean() {
            warn!(defaulted = extraction.defaulted.len(), "Estimating with defaulted fields");
        }

        let prediction = snapshot.predict(&extraction.features)?;
        // the f32 feature loses cents on large totals
        let total_paid = claim
            .financial_info
            .as_ref()
            .and_then(|financial| as_number(&financial.total_amount_paid))
            .unwrap_or(0.0);

        let estimation = Estimation {
            id: EstimationId::new_v7(),
            claim_id: claim.id,
            policyholder_id: claim.policyholder_id,
            reimbursement_class: prediction.calibrated.class,
            confidence: prediction.calibrated.confidence,
            reimbursement_amount: reimbursement_amount(prediction.reimbursement_fraction, total_paid),
            model_version: snapshot.version().to_string(),
            created_at: Utc::now(),
        };

        let stored = self.estimations.insert_if_absent(estimation).await?;
        info!(
            class = %stored.reimbursement_class,
            confidence = stored.confidence,
            amount = stored.reimbursement_amount,
            model_version = %stored.model_version,
            "Estimate stored"
        );
        Ok(stored)
    }
}
