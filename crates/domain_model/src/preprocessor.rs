//! Per-column standardization fitted on training data

use serde::{Deserialize, Serialize};

use domain_features::{FeatureVector, FEATURE_COUNT};

use crate::error::ModelError;

/// Standard scaler: `(x - mean) / std`, population standard deviation
///
/// Columns with zero variance use a scale of 1 so they map to zero
/// instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    mean: [f32; FEATURE_COUNT],
    scale: [f32; FEATURE_COUNT],
    samples: usize,
}

impl Preprocessor {
    /// Fits column statistics over `batch`
    ///
    /// # Errors
    ///
    /// [`ModelError::EmptyBatch`] when `batch` is empty, and
    /// [`ModelError::NonFinite`] when any value is NaN or infinite.
    pub fn fit(batch: &[FeatureVector]) -> Result<Self, ModelError> {
        if batch.is_empty() {
            return Err(ModelError::EmptyBatch);
        }
        if !batch.iter().all(FeatureVector::is_finite) {
            return Err(ModelError::NonFinite {
                what: "training features",
            });
        }

        let n = batch.len() as f64;
        let mut sum = [0.0f64; FEATURE_COUNT];
        for row in batch {
            for (s, v) in sum.iter_mut().zip(row.iter()) {
                *s += f64::from(*v);
            }
        }
        let mean = sum.map(|s| s / n);

        let mut squared = [0.0f64; FEATURE_COUNT];
        for row in batch {
            for ((acc, v), m) in squared.iter_mut().zip(row.iter()).zip(&mean) {
                let d = f64::from(*v) - m;
                *acc += d * d;
            }
        }
        let scale = squared.map(|s| {
            let std = (s / n).sqrt();
            if std > 0.0 { std as f32 } else { 1.0 }
        });

        Ok(Self {
            mean: mean.map(|m| m as f32),
            scale,
            samples: batch.len(),
        })
    }

    pub fn transform(&self, features: &FeatureVector) -> FeatureVector {
        features.map_indexed(|i, v| (v - self.mean[i]) / self.scale[i])
    }

    pub fn transform_batch(&self, batch: &[FeatureVector]) -> Vec<FeatureVector> {
        batch.iter().map(|f| self.transform(f)).collect()
    }

    pub fn mean(&self) -> &[f32; FEATURE_COUNT] {
        &self.mean
    }

    pub fn scale(&self) -> &[f32; FEATURE_COUNT] {
        &self.scale
    }

    /// Number of rows the statistics were fitted on
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Rejects a loaded scaler whose statistics cannot be applied
    pub fn validate(&self) -> Result<(), ModelError> {
        let usable = self.mean.iter().all(|m| m.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0);
        if usable {
            Ok(())
        } else {
            Err(ModelError::NonFinite {
                what: "preprocessor statistics",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(first: f32, second: f32) -> FeatureVector {
        let mut values = [0.0; FEATURE_COUNT];
        values[0] = first;
        values[1] = second;
        FeatureVector::new(values)
    }

    #[test]
    fn test_fit_and_transform() {
        let batch = vec![row(1.0, 10.0), row(3.0, 10.0)];
        let pre = Preprocessor::fit(&batch).unwrap();

        assert_eq!(pre.mean()[0], 2.0);
        assert_eq!(pre.scale()[0], 1.0);
        let out = pre.transform(&row(3.0, 10.0));
        assert_eq!(out[0], 1.0);
        // constant column maps to zero
        assert_eq!(out[1], 0.0);
        assert_eq!(pre.samples(), 2);
    }

    #[test]
    fn test_transformed_batch_is_centered() {
        let batch: Vec<_> = (0..10).map(|i| row(i as f32, (i * i) as f32)).collect();
        let pre = Preprocessor::fit(&batch).unwrap();
        let out = pre.transform_batch(&batch);

        for col in 0..2 {
            let mean: f32 = out.iter().map(|r| r[col]).sum::<f32>() / 10.0;
            let var: f32 = out.iter().map(|r| r[col] * r[col]).sum::<f32>() / 10.0;
            assert!(mean.abs() < 1e-5);
            assert!((var - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_empty_batch_rejected() {
        assert!(matches!(Preprocessor::fit(&[]), Err(ModelError::EmptyBatch)));
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(Preprocessor::fit(&[row(f32::NAN, 0.0)]).is_err());
    }
}
