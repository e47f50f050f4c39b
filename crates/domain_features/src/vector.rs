//! The fixed-order model input

use std::ops::Index;

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 12;

/// Column names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "sessions_attended",
    "total_amount_paid",
    "age",
    "health_condition_count",
    "smoker",
    "exercise_level",
    "severity_low",
    "severity_medium",
    "severity_high",
    "treatment_duration_months",
    "plan_min_fraction",
    "plan_max_fraction",
];

/// Column positions
pub mod index {
    pub const SESSIONS_ATTENDED: usize = 0;
    pub const TOTAL_AMOUNT_PAID: usize = 1;
    pub const AGE: usize = 2;
    pub const HEALTH_CONDITION_COUNT: usize = 3;
    pub const SMOKER: usize = 4;
    pub const EXERCISE_LEVEL: usize = 5;
    pub const SEVERITY_ONE_HOT: usize = 6;
    pub const TREATMENT_DURATION_MONTHS: usize = 9;
    pub const PLAN_MIN_FRACTION: usize = 10;
    pub const PLAN_MAX_FRACTION: usize = 11;
}

/// Exactly twelve real values in the order of [`FEATURE_NAMES`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    /// Builds a vector from a slice, which must have exactly twelve values
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        <[f32; FEATURE_COUNT]>::try_from(values).ok().map(Self)
    }

    pub fn as_array(&self) -> &[f32; FEATURE_COUNT] {
        &self.0
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.0.iter()
    }

    /// The three severity one-hot components
    pub fn severity_one_hot(&self) -> [f32; 3] {
        let start = index::SEVERITY_ONE_HOT;
        [self.0[start], self.0[start + 1], self.0[start + 2]]
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Applies `f` to every column, passing the column index
    pub fn map_indexed(&self, mut f: impl FnMut(usize, f32) -> f32) -> Self {
        let mut out = self.0;
        for (i, v) in out.iter_mut().enumerate() {
            *v = f(i, *v);
        }
        Self(out)
    }
}

impl Index<usize> for FeatureVector {
    type Output = f32;

    fn index(&self, idx: usize) -> &f32 {
        &self.0[idx]
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_requires_twelve_values() {
        assert!(FeatureVector::from_slice(&[0.0; 11]).is_none());
        assert!(FeatureVector::from_slice(&[0.0; 12]).is_some());
    }

    #[test]
    fn test_names_match_indices() {
        assert_eq!(FEATURE_NAMES[index::AGE], "age");
        assert_eq!(FEATURE_NAMES[index::SEVERITY_ONE_HOT], "severity_low");
        assert_eq!(FEATURE_NAMES[index::PLAN_MAX_FRACTION], "plan_max_fraction");
    }
}
