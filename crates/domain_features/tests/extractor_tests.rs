//! Tests for feature extraction over loosely typed records

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};

use domain_features::{
    ClaimRecord, PolicyholderRecord, FeatureExtractor, ExtractionConfig,
    FeatureExtractionError, RecordKind, FEATURE_COUNT,
};
use domain_features::vector::index;

const CLAIM_ID: &str = "6f1c1f9e-3b7a-4c55-9f0e-0c1d2e3f4a5b";
const HOLDER_ID: &str = "0a1b2c3d-4e5f-4a6b-8c7d-9e0f1a2b3c4d";

fn claim_doc() -> Value {
    json!({
        "_id": CLAIM_ID,
        "clientId": HOLDER_ID,
        "treatmentDetails": {
            "diagnosis": "Lumbar strain",
            "sessionsAttended": 10,
            "caseSeverity": 3,
            "treatmentDuration": "8 weeks",
            "treatmentType": "Physiotherapy"
        },
        "financialInfo": { "totalAmountPaid": 1500.0 }
    })
}

fn holder_doc() -> Value {
    json!({
        "_id": HOLDER_ID,
        "birthDate": "1990-06-15T00:00:00.000Z",
        "health": { "conditions": "asthma hypertension", "smoker": true, "exercise": "Sometimes" },
        "plan": { "range": { "min": 40, "max": 80 } }
    })
}

fn claim_from(doc: Value) -> ClaimRecord {
    serde_json::from_value(doc).expect("claim document")
}

fn holder_from(doc: Value) -> PolicyholderRecord {
    serde_json::from_value(doc).expect("policyholder document")
}

fn as_of() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

fn extract(claim: Value, holder: Value) -> Result<domain_features::Extraction, FeatureExtractionError> {
    FeatureExtractor::default().extract_at(&claim_from(claim), &holder_from(holder), as_of())
}

mod well_formed {
    use super::*;

    #[test]
    fn test_vector_layout() {
        let extraction = extract(claim_doc(), holder_doc()).unwrap();
        let f = extraction.features;

        assert!(extraction.is_clean());
        assert_eq!(f.len(), FEATURE_COUNT);
        assert_eq!(f[index::SESSIONS_ATTENDED], 10.0);
        assert_eq!(f[index::TOTAL_AMOUNT_PAID], 1500.0);
        assert_eq!(f[index::AGE], 33.0);
        assert_eq!(f[index::HEALTH_CONDITION_COUNT], 2.0);
        assert_eq!(f[index::SMOKER], 1.0);
        assert_eq!(f[index::EXERCISE_LEVEL], 1.0);
        assert_eq!(f.severity_one_hot(), [0.0, 1.0, 0.0]);
        assert_eq!(f[index::TREATMENT_DURATION_MONTHS], 2.0);
        assert_eq!(f[index::PLAN_MIN_FRACTION], 0.4);
        assert_eq!(f[index::PLAN_MAX_FRACTION], 0.8);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let mut claim = claim_doc();
        claim["treatmentDetails"]["sessionsAttended"] = json!("7");
        claim["treatmentDetails"]["caseSeverity"] = json!("5");
        claim["financialInfo"]["totalAmountPaid"] = json!("250.5");

        let extraction = extract(claim, holder_doc()).unwrap();
        assert!(extraction.is_clean());
        assert_eq!(extraction.features[index::SESSIONS_ATTENDED], 7.0);
        assert_eq!(extraction.features[index::TOTAL_AMOUNT_PAID], 250.5);
        assert_eq!(extraction.features.severity_one_hot(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let a = extract(claim_doc(), holder_doc()).unwrap();
        let b = extract(claim_doc(), holder_doc()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_naive_birth_date_uses_configured_timezone() {
        let mut holder = holder_doc();
        holder["birthDate"] = json!("1990-03-01");
        // 2024-03-01 05:00 UTC is still Feb 29 in Los Angeles
        let as_of = Utc.with_ymd_and_hms(2024, 3, 1, 5, 0, 0).unwrap();
        let extractor = FeatureExtractor::new(ExtractionConfig {
            timezone: chrono_tz::America::Los_Angeles,
        });

        let extraction = extractor
            .extract_at(&claim_from(claim_doc()), &holder_from(holder), as_of)
            .unwrap();
        assert_eq!(extraction.features[index::AGE], 33.0);
    }
}

mod severity_clamping {
    use super::*;

    fn one_hot_for(severity: Value) -> [f32; 3] {
        let mut claim = claim_doc();
        claim["treatmentDetails"]["caseSeverity"] = severity;
        extract(claim, holder_doc()).unwrap().features.severity_one_hot()
    }

    #[test]
    fn test_out_of_range_severities_share_edge_buckets() {
        let valid = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        for severity in [-3, 0, 5, 9] {
            assert!(valid.contains(&one_hot_for(json!(severity))));
        }
        assert_eq!(one_hot_for(json!(-3)), one_hot_for(json!(0)));
        assert_eq!(one_hot_for(json!(9)), one_hot_for(json!(5)));
    }

    #[test]
    fn test_unparseable_severity_defaults_to_lowest_bucket() {
        assert_eq!(one_hot_for(json!("severe")), [1.0, 0.0, 0.0]);
    }
}

mod duration_parsing {
    use super::*;

    fn months_for(duration: Value) -> f32 {
        let mut claim = claim_doc();
        claim["treatmentDetails"]["treatmentDuration"] = duration;
        extract(claim, holder_doc()).unwrap().features[index::TREATMENT_DURATION_MONTHS]
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(months_for(json!("8 weeks")), 2.0);
        assert_eq!(months_for(json!("3 months")), 3.0);
        assert_eq!(months_for(json!("garbage")), 1.0);
    }

    #[test]
    fn test_missing_duration_defaults_to_one_month() {
        let mut claim = claim_doc();
        claim["treatmentDetails"]
            .as_object_mut()
            .unwrap()
            .remove("treatmentDuration");
        let extraction = extract(claim, holder_doc()).unwrap();
        assert_eq!(extraction.features[index::TREATMENT_DURATION_MONTHS], 1.0);
    }
}

mod degraded_values {
    use super::*;

    #[test]
    fn test_bad_values_default_and_are_reported() {
        let mut claim = claim_doc();
        claim["treatmentDetails"]["sessionsAttended"] = json!("many");
        claim["financialInfo"]["totalAmountPaid"] = json!({"amount": 10});
        let mut holder = holder_doc();
        holder["birthDate"] = json!("not a date");
        holder["health"]["exercise"] = json!("Daily");

        let extraction = extract(claim, holder).unwrap();
        let f = extraction.features;
        assert_eq!(f[index::SESSIONS_ATTENDED], 0.0);
        assert_eq!(f[index::TOTAL_AMOUNT_PAID], 0.0);
        assert_eq!(f[index::AGE], 0.0);
        assert_eq!(f[index::EXERCISE_LEVEL], 0.0);

        let fields: Vec<_> = extraction.defaulted.iter().map(|e| e.location()).collect();
        assert_eq!(
            fields,
            vec!["sessionsAttended", "totalAmountPaid", "birthDate", "health.exercise"]
        );
        assert!(extraction.defaulted.iter().all(|e| !e.is_structural()));
    }

    #[test]
    fn test_condition_list_is_counted() {
        let mut holder = holder_doc();
        holder["health"]["conditions"] = json!(["asthma", "diabetes", "migraine"]);
        let extraction = extract(claim_doc(), holder).unwrap();
        assert_eq!(extraction.features[index::HEALTH_CONDITION_COUNT], 3.0);
    }

    #[test]
    fn test_plan_fractions_are_clamped() {
        let mut holder = holder_doc();
        holder["plan"]["range"] = json!({ "min": "-20", "max": 140 });
        let extraction = extract(claim_doc(), holder).unwrap();
        assert_eq!(extraction.features[index::PLAN_MIN_FRACTION], 0.0);
        assert_eq!(extraction.features[index::PLAN_MAX_FRACTION], 1.0);
    }
}

mod structural_errors {
    use super::*;

    fn without(mut doc: Value, key: &str) -> Value {
        doc.as_object_mut().unwrap().remove(key);
        doc
    }

    #[test]
    fn test_missing_treatment_details_is_fatal() {
        let err = extract(without(claim_doc(), "treatmentDetails"), holder_doc()).unwrap_err();
        assert!(err.is_structural());
        assert!(matches!(
            err,
            FeatureExtractionError::MissingGroup { record: RecordKind::Claim, group: "treatmentDetails", .. }
        ));
    }

    #[test]
    fn test_missing_financial_info_is_fatal() {
        let err = extract(without(claim_doc(), "financialInfo"), holder_doc()).unwrap_err();
        assert_eq!(err.location(), "financialInfo");
    }

    #[test]
    fn test_missing_health_and_plan_are_fatal() {
        let err = extract(claim_doc(), without(holder_doc(), "health")).unwrap_err();
        assert!(matches!(
            err,
            FeatureExtractionError::MissingGroup { record: RecordKind::Policyholder, group: "health", .. }
        ));

        let err = extract(claim_doc(), without(holder_doc(), "plan")).unwrap_err();
        assert_eq!(err.location(), "plan");

        let mut holder = holder_doc();
        holder["plan"] = json!({});
        let err = extract(claim_doc(), holder).unwrap_err();
        assert_eq!(err.location(), "plan.range");
    }

    #[test]
    fn test_error_message_names_record() {
        let err = extract(without(claim_doc(), "treatmentDetails"), holder_doc()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("claim"));
        assert!(message.contains(CLAIM_ID));
    }
}

proptest! {
    #[test]
    fn prop_vector_is_well_formed(
        sessions in -5i64..200,
        severity in -10i64..20,
        amount in 0.0f64..100_000.0,
        plan_min in -50i64..150,
        plan_max in -50i64..150,
        weeks in 0u32..104,
    ) {
        let mut claim = claim_doc();
        claim["treatmentDetails"]["sessionsAttended"] = json!(sessions);
        claim["treatmentDetails"]["caseSeverity"] = json!(severity);
        claim["treatmentDetails"]["treatmentDuration"] = json!(format!("{} weeks", weeks));
        claim["financialInfo"]["totalAmountPaid"] = json!(amount);
        let mut holder = holder_doc();
        holder["plan"]["range"] = json!({ "min": plan_min, "max": plan_max });

        let f = extract(claim, holder).unwrap().features;
        prop_assert!(f.is_finite());
        prop_assert_eq!(f.severity_one_hot().iter().sum::<f32>(), 1.0);
        prop_assert!((0.0..=1.0).contains(&f[index::PLAN_MIN_FRACTION]));
        prop_assert!((0.0..=1.0).contains(&f[index::PLAN_MAX_FRACTION]));
    }
}
