//! Estimation Domain Ports
//!
//! The service reads source records and persists estimates through these
//! traits, so PostgreSQL, JSON snapshots and in-memory maps are
//! interchangeable.
//!
//! # Architecture
//!
//! - **RecordStore**: read-only access to claims and policyholders
//! - **EstimationStore**: the write-once estimate cache
//! - **TrainingDataSource**: where the retrainer gets labelled samples
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = EstimationService::new(
//!     Arc::new(PostgresRecordStore::new(pool.clone())),
//!     Arc::new(PostgresEstimationStore::new(pool)),
//!     handle,
//!     FeatureExtractor::default(),
//! );
//! ```

use async_trait::async_trait;

use core_kernel::{ClaimId, DomainPort, HealthCheckable, PolicyholderId, PortError};
use domain_features::{ClaimRecord, PolicyholderRecord};
use domain_model::LabeledSample;

use crate::estimation::Estimation;

/// Read access to source records
#[async_trait]
pub trait RecordStore: DomainPort + HealthCheckable {
    /// Retrieves a claim by ID
    ///
    /// # Returns
    ///
    /// The claim if found, or `PortError::NotFound`
    async fn get_claim(&self, id: ClaimId) -> Result<ClaimRecord, PortError>;

    /// Retrieves a policyholder by ID
    ///
    /// # Returns
    ///
    /// The policyholder if found, or `PortError::NotFound`
    async fn get_policyholder(&self, id: PolicyholderId) -> Result<PolicyholderRecord, PortError>;

    /// Every claim, labelled or not, ordered by ID
    async fn training_claims(&self) -> Result<Vec<ClaimRecord>, PortError>;

    /// Policyholders for the given IDs; unknown IDs are skipped
    async fn get_policyholders(
        &self,
        ids: Vec<PolicyholderId>,
    ) -> Result<Vec<PolicyholderRecord>, PortError>;
}

/// Write-once storage of estimates, keyed by claim
#[async_trait]
pub trait EstimationStore: DomainPort + HealthCheckable {
    async fn find_by_claim(&self, claim_id: ClaimId) -> Result<Option<Estimation>, PortError>;

    /// Stores `estimation` unless one already exists for its claim
    ///
    /// # Returns
    ///
    /// The record that is stored for the claim afterwards: `estimation`
    /// itself, or the one a concurrent caller stored first.
    async fn insert_if_absent(&self, estimation: Estimation) -> Result<Estimation, PortError>;
}

/// Supplies training samples to the retrainer
///
/// Unlabelled claims are passed through; the pipeline records why it
/// excludes them.
#[async_trait]
pub trait TrainingDataSource: DomainPort {
    /// Short description for logs
    fn name(&self) -> &str;

    async fn load_samples(&self) -> Result<Vec<LabeledSample>, PortError>;
}
