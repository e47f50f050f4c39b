//! PostgreSQL record store
//!
//! Implements [`RecordStore`] over the JSONB document tables. Documents
//! that no longer deserialize are reported as transformation errors on
//! direct lookup and skipped with a warning when listing training data.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PolicyholderId, PortError};
use domain_estimation::RecordStore;
use domain_features::{ClaimRecord, PolicyholderRecord};

use crate::pool::ping;
use crate::repositories::{DocumentRow, RecordRepository};

/// PostgreSQL-backed implementation of [`RecordStore`]
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    repository: RecordRepository,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: RecordRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresRecordStore {}

#[async_trait]
impl HealthCheckable for PostgresRecordStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(self.repository.pool(), "postgres-record-store").await
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self), fields(claim_id = %id))]
    async fn get_claim(&self, id: ClaimId) -> Result<ClaimRecord, PortError> {
        let row = self.repository.get_claim(*id.as_uuid()).await?;
        decode("claim", row)
    }

    #[instrument(skip(self), fields(policyholder_id = %id))]
    async fn get_policyholder(&self, id: PolicyholderId) -> Result<PolicyholderRecord, PortError> {
        let row = self.repository.get_policyholder(*id.as_uuid()).await?;
        decode("policyholder", row)
    }

    #[instrument(skip(self))]
    async fn training_claims(&self) -> Result<Vec<ClaimRecord>, PortError> {
        let rows = self.repository.all_claims().await?;
        let claims = decode_all("claim", rows);
        debug!(count = claims.len(), "Loaded training claims");
        Ok(claims)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_policyholders(
        &self,
        ids: Vec<PolicyholderId>,
    ) -> Result<Vec<PolicyholderRecord>, PortError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = self.repository.policyholders(&ids).await?;
        Ok(decode_all("policyholder", rows))
    }
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, row: DocumentRow) -> Result<T, PortError> {
    serde_json::from_value(row.document)
        .map_err(|e| PortError::transformation(format!("stored {} {} is malformed: {}", kind, row.id, e)))
}

fn decode_all<T: serde::de::DeserializeOwned>(kind: &str, rows: Vec<DocumentRow>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(kind, row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed document");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use test_utils::{ClaimRecordBuilder, IdFixtures};

    fn row(document: Value) -> DocumentRow {
        DocumentRow {
            id: *IdFixtures::claim_id().as_uuid(),
            document,
        }
    }

    #[test]
    fn test_decode_stored_claim() {
        let claim: ClaimRecord = decode("claim", row(ClaimRecordBuilder::new().to_json())).unwrap();
        assert_eq!(claim.id, IdFixtures::claim_id());
    }

    #[test]
    fn test_decode_malformed_document_is_transformation_error() {
        let err = decode::<ClaimRecord>("claim", row(json!({ "clientId": 4 }))).unwrap_err();
        assert!(matches!(err, PortError::Transformation { .. }));
    }

    #[test]
    fn test_decode_all_skips_malformed_documents() {
        let rows = vec![
            row(ClaimRecordBuilder::new().to_json()),
            row(json!("not an object")),
        ];
        let claims: Vec<ClaimRecord> = decode_all("claim", rows);
        assert_eq!(claims.len(), 1);
    }
}
