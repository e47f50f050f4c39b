//! Custom Test Assertions
//!
//! Assertion helpers that give more meaningful failure messages than bare
//! `assert!` for probabilities and feature vectors.

use domain_features::vector::index;
use domain_features::FeatureVector;

/// Asserts that two floats are within `tolerance` of each other
pub fn assert_approx_eq(actual: f64, expected: f64, tolerance: f64) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "Values differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a confidence lies in (0, 1]
pub fn assert_confidence(confidence: f64) {
    assert!(
        confidence > 0.0 && confidence <= 1.0,
        "Expected confidence in (0, 1], got {}",
        confidence
    );
}

/// Asserts the invariants every extracted vector must hold
///
/// # Panics
///
/// Panics if any value is non-finite, the severity one-hot does not sum to
/// one, or a plan fraction falls outside [0, 1].
pub fn assert_features_well_formed(features: &FeatureVector) {
    assert!(features.is_finite(), "Non-finite feature vector: {:?}", features);

    let one_hot = features.severity_one_hot();
    assert_eq!(
        one_hot.iter().sum::<f32>(),
        1.0,
        "Severity one-hot must have exactly one bit set: {:?}",
        one_hot
    );

    for (name, idx) in [
        ("plan_min_fraction", index::PLAN_MIN_FRACTION),
        ("plan_max_fraction", index::PLAN_MAX_FRACTION),
    ] {
        assert!(
            (0.0..=1.0).contains(&features[idx]),
            "{} out of range: {}",
            name,
            features[idx]
        );
    }
}
