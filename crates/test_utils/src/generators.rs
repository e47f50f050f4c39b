//! Property-Based Test Generators
//!
//! Proptest strategies for loosely typed source values and whole records.
//! Generated records always carry every required group, so extraction must
//! succeed on them.

use proptest::prelude::*;
use serde_json::{json, Value};
use uuid::Uuid;

use core_kernel::{ClaimId, PolicyholderId};
use domain_features::{ClaimRecord, PolicyholderRecord};

use crate::builders::{ClaimRecordBuilder, PolicyholderRecordBuilder};

pub fn claim_id_strategy() -> impl Strategy<Value = ClaimId> {
    any::<u128>().prop_map(|n| ClaimId::from_uuid(Uuid::from_u128(n)))
}

pub fn policyholder_id_strategy() -> impl Strategy<Value = PolicyholderId> {
    any::<u128>().prop_map(|n| PolicyholderId::from_uuid(Uuid::from_u128(n)))
}

/// Integers as JSON numbers, numeric strings, or junk
pub fn loose_integer_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-20i64..200).prop_map(|n| json!(n)),
        2 => (-20i64..200).prop_map(|n| json!(n.to_string())),
        1 => (-20i64..200).prop_map(|n| json!(n as f64 + 0.5)),
        1 => Just(Value::Null),
        1 => "[a-z]{1,8}".prop_map(Value::String),
    ]
}

/// Amounts as JSON numbers, numeric strings, or junk
pub fn loose_amount_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (0.0f64..50_000.0).prop_map(|n| json!(n)),
        2 => (0.0f64..50_000.0).prop_map(|n| json!(format!("{:.2}", n))),
        1 => Just(Value::Null),
        1 => Just(json!({"amount": 10})),
    ]
}

/// Durations in any of the accepted and rejected shapes
pub fn duration_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0u32..104).prop_map(|n| json!(format!("{} weeks", n))),
        (0u32..24).prop_map(|n| json!(format!("{} months", n))),
        (0u32..24).prop_map(|n| json!(n)),
        Just(json!("garbage")),
        Just(Value::Null),
    ]
}

pub fn exercise_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(json!("Often")),
        Just(json!("Sometimes")),
        Just(json!("Never")),
        Just(json!("Daily")),
        Just(Value::Null),
    ]
}

/// Birth dates in every accepted shape, plus junk
pub fn birth_date_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        (1930i32..2020, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| json!(format!("{:04}-{:02}-{:02}T00:00:00.000Z", y, m, d))),
        (1930i32..2020, 1u32..13, 1u32..29)
            .prop_map(|(y, m, d)| json!(format!("{:04}-{:02}-{:02}", y, m, d))),
        (-1_000_000_000_000i64..1_500_000_000_000).prop_map(|ms| json!(ms)),
        Just(json!("not a date")),
    ]
}

/// Structurally complete claims with arbitrary field values
pub fn claim_record_strategy() -> impl Strategy<Value = ClaimRecord> {
    (
        claim_id_strategy(),
        policyholder_id_strategy(),
        loose_integer_strategy(),
        loose_integer_strategy(),
        duration_strategy(),
        loose_amount_strategy(),
    )
        .prop_map(|(id, holder, sessions, severity, duration, total)| {
            ClaimRecordBuilder::new()
                .with_id(id)
                .for_policyholder(holder)
                .with_sessions(sessions)
                .with_severity(severity)
                .with_duration(duration)
                .with_total_paid(total)
                .build()
        })
}

/// Structurally complete policyholders with arbitrary field values
pub fn policyholder_record_strategy() -> impl Strategy<Value = PolicyholderRecord> {
    (
        policyholder_id_strategy(),
        birth_date_strategy(),
        prop_oneof![Just(json!("asthma")), Just(json!("")), Just(json!(["a", "b", ""])), Just(Value::Null)],
        prop_oneof![Just(json!(true)), Just(json!("yes")), Just(json!(0)), Just(json!("maybe"))],
        exercise_strategy(),
        loose_integer_strategy(),
        loose_integer_strategy(),
    )
        .prop_map(|(id, birth, conditions, smoker, exercise, min, max)| {
            PolicyholderRecordBuilder::new()
                .with_id(id)
                .with_birth_date(birth)
                .with_conditions(conditions)
                .with_smoker(smoker)
                .with_exercise(exercise)
                .with_plan_range(min, max)
                .build()
        })
}
