//! Training samples read from the live record store

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use core_kernel::{DomainPort, PortError};
use domain_model::LabeledSample;

use crate::adapters::join_samples;
use crate::ports::{RecordStore, TrainingDataSource};

pub struct RecordStoreSource {
    store: Arc<dyn RecordStore>,
}

impl RecordStoreSource {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

impl DomainPort for RecordStoreSource {}

#[async_trait]
impl TrainingDataSource for RecordStoreSource {
    fn name(&self) -> &str {
        "record-store"
    }

    async fn load_samples(&self) -> Result<Vec<LabeledSample>, PortError> {
        let claims = self.store.training_claims().await?;
        let ids: BTreeSet<_> = claims.iter().map(|c| c.policyholder_id).collect();
        let policyholders = self.store.get_policyholders(ids.into_iter().collect()).await?;
        debug!(claims = claims.len(), policyholders = policyholders.len(), "Loaded live training records");
        Ok(join_samples(claims, policyholders))
    }
}
