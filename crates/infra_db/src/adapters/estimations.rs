//! PostgreSQL estimation store

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{
    ClaimId, DomainPort, EstimationId, HealthCheckResult, HealthCheckable, PolicyholderId, PortError,
};
use domain_estimation::{Estimation, EstimationStore};
use domain_features::ReimbursementClass;

use crate::pool::ping;
use crate::repositories::{EstimationRepository, EstimationRow};

/// PostgreSQL-backed implementation of [`EstimationStore`]
///
/// The unique index on `claim_id` makes concurrent first requests for the
/// same claim converge on one row.
#[derive(Debug, Clone)]
pub struct PostgresEstimationStore {
    repository: EstimationRepository,
}

impl PostgresEstimationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: EstimationRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresEstimationStore {}

#[async_trait]
impl HealthCheckable for PostgresEstimationStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(self.repository.pool(), "postgres-estimation-store").await
    }
}

#[async_trait]
impl EstimationStore for PostgresEstimationStore {
    #[instrument(skip(self), fields(claim_id = %claim_id))]
    async fn find_by_claim(&self, claim_id: ClaimId) -> Result<Option<Estimation>, PortError> {
        self.repository
            .find_by_claim(*claim_id.as_uuid())
            .await?
            .map(row_to_estimation)
            .transpose()
    }

    #[instrument(skip(self, estimation), fields(claim_id = %estimation.claim_id))]
    async fn insert_if_absent(&self, estimation: Estimation) -> Result<Estimation, PortError> {
        let stored = self
            .repository
            .insert_if_absent(&estimation_to_row(&estimation))
            .await?;
        row_to_estimation(stored)
    }
}

fn estimation_to_row(estimation: &Estimation) -> EstimationRow {
    EstimationRow {
        estimation_id: *estimation.id.as_uuid(),
        claim_id: *estimation.claim_id.as_uuid(),
        policyholder_id: *estimation.policyholder_id.as_uuid(),
        reimbursement_class: estimation.reimbursement_class.as_str().to_string(),
        confidence: estimation.confidence,
        reimbursement_amount: estimation.reimbursement_amount,
        model_version: estimation.model_version.clone(),
        created_at: estimation.created_at,
    }
}

fn row_to_estimation(row: EstimationRow) -> Result<Estimation, PortError> {
    let reimbursement_class: ReimbursementClass = row.reimbursement_class.parse().map_err(|_| {
        PortError::transformation(format!(
            "estimation {} has unknown class '{}'",
            row.estimation_id, row.reimbursement_class
        ))
    })?;

    Ok(Estimation {
        id: EstimationId::from_uuid(row.estimation_id),
        claim_id: ClaimId::from_uuid(row.claim_id),
        policyholder_id: PolicyholderId::from_uuid(row.policyholder_id),
        reimbursement_class,
        confidence: row.confidence,
        reimbursement_amount: row.reimbursement_amount,
        model_version: row.model_version,
        created_at: row.created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{IdFixtures, TemporalFixtures};

    fn estimation() -> Estimation {
        Estimation {
            id: EstimationId::new_v7(),
            claim_id: IdFixtures::claim_id(),
            policyholder_id: IdFixtures::policyholder_id(),
            reimbursement_class: ReimbursementClass::Medium,
            confidence: 0.61,
            reimbursement_amount: 420.5,
            model_version: "1.3".to_string(),
            created_at: TemporalFixtures::reference_time(),
        }
    }

    #[test]
    fn test_row_preserves_estimate() {
        let original = estimation();
        let row = estimation_to_row(&original);
        assert_eq!(row.reimbursement_class, "Medium");
        assert_eq!(row_to_estimation(row).unwrap(), original);
    }

    #[test]
    fn test_unknown_class_is_transformation_error() {
        let mut row = estimation_to_row(&estimation());
        row.reimbursement_class = "Extreme".to_string();
        assert!(matches!(row_to_estimation(row), Err(PortError::Transformation { .. })));
    }
}
