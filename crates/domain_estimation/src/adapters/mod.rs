//! Port adapters that need no external service
//!
//! - `memory`: `tokio::sync::RwLock`-guarded maps, for tests and snapshot mode
//! - `snapshot`: JSON export files of clients and medical bulletins
//! - `live`: training samples read through any [`crate::RecordStore`]

pub mod live;
pub mod memory;
pub mod snapshot;

pub use live::RecordStoreSource;
pub use memory::{InMemoryEstimationStore, InMemoryRecordStore};
pub use snapshot::{JsonSnapshotSource, Snapshot, SnapshotFiles};

use std::collections::HashMap;

use domain_features::{ClaimRecord, PolicyholderRecord};
use domain_model::LabeledSample;

/// Pairs every claim with its policyholder, when the policyholder is known
pub(crate) fn join_samples(
    claims: Vec<ClaimRecord>,
    policyholders: Vec<PolicyholderRecord>,
) -> Vec<LabeledSample> {
    let by_id: HashMap<_, _> = policyholders.into_iter().map(|p| (p.id, p)).collect();
    claims
        .into_iter()
        .map(|claim| {
            let holder = by_id.get(&claim.policyholder_id).cloned();
            LabeledSample::new(claim, holder)
        })
        .collect()
}
