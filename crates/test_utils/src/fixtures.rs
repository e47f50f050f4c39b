//! Pre-built Test Fixtures
//!
//! Fixed identifiers and times keep assertions predictable; the labelled
//! corpus gives training tests a class signal strong enough to learn.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use core_kernel::{ClaimId, PolicyholderId};
use domain_features::{ClaimRecord, PolicyholderRecord};

use crate::builders::{ClaimRecordBuilder, PolicyholderRecordBuilder};

/// Fixed identifiers
pub struct IdFixtures;

impl IdFixtures {
    pub fn claim_id() -> ClaimId {
        Self::claim_id_n(0)
    }

    pub fn policyholder_id() -> PolicyholderId {
        Self::policyholder_id_n(0)
    }

    /// The `n`-th distinct claim id
    pub fn claim_id_n(n: u64) -> ClaimId {
        ClaimId::from_uuid(Uuid::from_u128(0xC1A1_0000_0000_4000_8000_0000_0000_0000 | u128::from(n)))
    }

    /// The `n`-th distinct policyholder id
    pub fn policyholder_id_n(n: u64) -> PolicyholderId {
        PolicyholderId::from_uuid(Uuid::from_u128(0x0B0D_0000_0000_4000_8000_0000_0000_0000 | u128::from(n)))
    }
}

/// Fixed reference times
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Reference "now" for age computations
    pub fn reference_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }
}

/// Labelled training corpora
pub struct CorpusFixtures;

impl CorpusFixtures {
    /// `count` labelled (claim, policyholder) pairs cycling Low, Medium, High
    ///
    /// Severity, sessions, plan range and reimbursed share all rise with
    /// the class, so the classes are separable.
    pub fn labeled(count: usize) -> Vec<(ClaimRecord, PolicyholderRecord)> {
        (0..count).map(Self::labeled_pair).collect()
    }

    /// The `i`-th pair of [`CorpusFixtures::labeled`]
    pub fn labeled_pair(i: usize) -> (ClaimRecord, PolicyholderRecord) {
        let tier = (i % 3) as i64;
        let jitter = (i / 3 % 4) as i64;
        let label = ["Low", "Medium", "High"][tier as usize];
        let total = 500.0 + 300.0 * tier as f64 + 25.0 * jitter as f64;
        let share = 0.2 + 0.3 * tier as f64;

        let holder_id = IdFixtures::policyholder_id_n(i as u64);
        let claim = ClaimRecordBuilder::new()
            .with_id(IdFixtures::claim_id_n(i as u64))
            .for_policyholder(holder_id)
            .with_sessions(2 + tier * 6 + jitter)
            .with_severity(tier * 2 + (jitter % 2))
            .with_duration(format!("{} weeks", 4 + tier * 4 + jitter))
            .with_total_paid(total)
            .with_class(label)
            .with_reimbursed(total * share)
            .build();
        let holder = PolicyholderRecordBuilder::new()
            .with_id(holder_id)
            .with_birth_date(format!("{}-05-20", 1960 + (i % 40)))
            .with_smoker(tier == 2)
            .with_exercise(["Often", "Sometimes", "Never"][tier as usize])
            .with_plan_range(10 + tier * 20, 40 + tier * 20)
            .build();
        (claim, holder)
    }
}
