//! In-memory record and estimation stores

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use core_kernel::{ClaimId, DomainPort, HealthCheckResult, HealthCheckable, PolicyholderId, PortError};
use domain_features::{ClaimRecord, PolicyholderRecord};

use crate::estimation::Estimation;
use crate::ports::{EstimationStore, RecordStore};

/// Claims and policyholders held in memory
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    claims: RwLock<HashMap<ClaimId, ClaimRecord>>,
    policyholders: RwLock<HashMap<PolicyholderId, PolicyholderRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store
    pub fn with_records(claims: Vec<ClaimRecord>, policyholders: Vec<PolicyholderRecord>) -> Self {
        Self {
            claims: RwLock::new(claims.into_iter().map(|c| (c.id, c)).collect()),
            policyholders: RwLock::new(policyholders.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    pub async fn insert_claim(&self, claim: ClaimRecord) {
        self.claims.write().await.insert(claim.id, claim);
    }

    pub async fn insert_policyholder(&self, holder: PolicyholderRecord) {
        self.policyholders.write().await.insert(holder.id, holder);
    }
}

impl DomainPort for InMemoryRecordStore {}

#[async_trait]
impl HealthCheckable for InMemoryRecordStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-record-store")
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_claim(&self, id: ClaimId) -> Result<ClaimRecord, PortError> {
        self.claims
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Claim", id))
    }

    async fn get_policyholder(&self, id: PolicyholderId) -> Result<PolicyholderRecord, PortError> {
        self.policyholders
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Policyholder", id))
    }

    async fn training_claims(&self) -> Result<Vec<ClaimRecord>, PortError> {
        let mut claims: Vec<_> = self.claims.read().await.values().cloned().collect();
        // stable order keeps training reproducible
        claims.sort_by_key(|c| c.id);
        Ok(claims)
    }

    async fn get_policyholders(
        &self,
        ids: Vec<PolicyholderId>,
    ) -> Result<Vec<PolicyholderRecord>, PortError> {
        let holders = self.policyholders.read().await;
        Ok(ids.into_iter().filter_map(|id| holders.get(&id).cloned()).collect())
    }
}

/// Estimates held in memory, one per claim
#[derive(Debug, Default)]
pub struct InMemoryEstimationStore {
    estimations: RwLock<HashMap<ClaimId, Estimation>>,
}

impl InMemoryEstimationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.estimations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.estimations.read().await.is_empty()
    }
}

impl DomainPort for InMemoryEstimationStore {}

#[async_trait]
impl HealthCheckable for InMemoryEstimationStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-estimation-store")
    }
}

#[async_trait]
impl EstimationStore for InMemoryEstimationStore {
    async fn find_by_claim(&self, claim_id: ClaimId) -> Result<Option<Estimation>, PortError> {
        Ok(self.estimations.read().await.get(&claim_id).cloned())
    }

    async fn insert_if_absent(&self, estimation: Estimation) -> Result<Estimation, PortError> {
        let mut estimations = self.estimations.write().await;
        Ok(estimations
            .entry(estimation.claim_id)
            .or_insert(estimation)
            .clone())
    }
}
