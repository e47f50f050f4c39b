//! JSON export files of clients and medical bulletins
//!
//! Each file holds one JSON array of documents. Documents that do not
//! deserialize are skipped with a warning so one bad export row cannot block
//! training.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use core_kernel::{DomainPort, PortError};
use domain_features::{ClaimRecord, PolicyholderRecord};
use domain_model::LabeledSample;

use crate::adapters::join_samples;
use crate::ports::TrainingDataSource;

/// Locations of the two export files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFiles {
    pub policyholders: PathBuf,
    pub claims: PathBuf,
}

impl Default for SnapshotFiles {
    fn default() -> Self {
        Self {
            policyholders: PathBuf::from("data/clients.json"),
            claims: PathBuf::from("data/medicalBulletins.json"),
        }
    }
}

/// Parsed contents of a snapshot
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub policyholders: Vec<PolicyholderRecord>,
    pub claims: Vec<ClaimRecord>,
    /// Documents that failed to deserialize
    pub skipped: usize,
}

impl Snapshot {
    #[instrument(skip_all, fields(claims = %files.claims.display()))]
    pub async fn load(files: &SnapshotFiles) -> Result<Self, PortError> {
        let (policyholders, skipped_holders) = read_documents(&files.policyholders).await?;
        let (claims, skipped_claims) = read_documents(&files.claims).await?;
        let snapshot = Self {
            policyholders,
            claims,
            skipped: skipped_holders + skipped_claims,
        };
        info!(
            policyholders = snapshot.policyholders.len(),
            claims = snapshot.claims.len(),
            skipped = snapshot.skipped,
            "Loaded record snapshot"
        );
        Ok(snapshot)
    }
}

async fn read_documents<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize), PortError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| PortError::Connection {
        message: format!("cannot read {}", path.display()),
        source: Some(Box::new(e)),
    })?;
    let documents: Vec<Value> = serde_json::from_slice(&bytes).map_err(|e| {
        PortError::transformation(format!("{} is not a JSON array: {}", path.display(), e))
    })?;

    let mut parsed = Vec::with_capacity(documents.len());
    let mut skipped = 0;
    for (position, document) in documents.into_iter().enumerate() {
        match serde_json::from_value(document) {
            Ok(record) => parsed.push(record),
            Err(e) => {
                warn!(file = %path.display(), position, error = %e, "Skipping malformed document");
                skipped += 1;
            }
        }
    }
    Ok((parsed, skipped))
}

/// Training samples from every claim of a snapshot
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    files: SnapshotFiles,
}

impl JsonSnapshotSource {
    pub fn new(files: SnapshotFiles) -> Self {
        Self { files }
    }
}

impl DomainPort for JsonSnapshotSource {}

#[async_trait]
impl TrainingDataSource for JsonSnapshotSource {
    fn name(&self) -> &str {
        "json-snapshot"
    }

    async fn load_samples(&self) -> Result<Vec<LabeledSample>, PortError> {
        let snapshot = Snapshot::load(&self.files).await?;
        Ok(join_samples(snapshot.claims, snapshot.policyholders))
    }
}
