//! The swappable model used for serving
//!
//! Readers take an `Arc` snapshot and keep it for the whole request; a
//! retrain publishes a new snapshot with a single atomic store, so no
//! request ever mixes weights, scaler and version from different runs.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use domain_features::FeatureVector;
use domain_model::{
    Calibrated, HeadOutputs, ModelArtifact, ModelError, ModelVersion, TemperatureCalibrator,
};

/// Calibrated output of one inference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub calibrated: Calibrated,
    pub reimbursement_fraction: f32,
}

/// An immutable model plus its calibrator
#[derive(Debug)]
pub struct ModelSnapshot {
    artifact: ModelArtifact,
    calibrator: TemperatureCalibrator,
    loaded_at: DateTime<Utc>,
}

impl ModelSnapshot {
    pub fn new(artifact: ModelArtifact, calibrator: TemperatureCalibrator) -> Self {
        Self {
            artifact,
            calibrator,
            loaded_at: Utc::now(),
        }
    }

    pub fn version(&self) -> ModelVersion {
        self.artifact.version
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Preprocess, forward and calibrate
    ///
    /// Without a fitted preprocessor the features pass through unscaled.
    pub fn predict(&self, features: &FeatureVector) -> Result<Prediction, ModelError> {
        let input = match &self.artifact.preprocessor {
            Some(preprocessor) => preprocessor.transform(features),
            None => {
                warn!(version = %self.artifact.version, "No fitted preprocessor, using raw features");
                *features
            }
        };

        let HeadOutputs {
            class_logits,
            reimbursement_fraction,
        } = self.artifact.model.forward(&input);
        if !reimbursement_fraction.is_finite() {
            return Err(ModelError::NonFinite {
                what: "reimbursement fraction",
            });
        }

        Ok(Prediction {
            calibrated: self.calibrator.calibrate(&class_logits)?,
            reimbursement_fraction,
        })
    }
}

/// Shared, atomically replaceable reference to the serving model
#[derive(Debug, Clone)]
pub struct ModelHandle {
    current: Arc<ArcSwap<ModelSnapshot>>,
}

impl ModelHandle {
    pub fn new(snapshot: ModelSnapshot) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(snapshot)),
        }
    }

    /// The snapshot to use for one request
    pub fn load(&self) -> Arc<ModelSnapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> ModelVersion {
        self.current.load().version()
    }

    /// Publishes `snapshot` and returns the one it replaced
    pub fn swap(&self, snapshot: ModelSnapshot) -> Arc<ModelSnapshot> {
        let version = snapshot.version();
        let previous = self.current.swap(Arc::new(snapshot));
        info!(from = %previous.version(), to = %version, "Swapped serving model");
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(version: ModelVersion) -> ModelSnapshot {
        let mut artifact = ModelArtifact::untrained(11);
        artifact.version = version;
        ModelSnapshot::new(artifact, TemperatureCalibrator::default())
    }

    #[test]
    fn test_loaded_snapshot_survives_swap() {
        let handle = ModelHandle::new(snapshot(ModelVersion::initial()));
        let held = handle.load();

        let previous = handle.swap(snapshot(ModelVersion::new(1, 1)));

        assert_eq!(held.version(), ModelVersion::initial());
        assert_eq!(previous.version(), ModelVersion::initial());
        assert_eq!(handle.version(), ModelVersion::new(1, 1));
    }

    #[test]
    fn test_clones_share_the_same_slot() {
        let handle = ModelHandle::new(snapshot(ModelVersion::initial()));
        let clone = handle.clone();
        handle.swap(snapshot(ModelVersion::new(1, 3)));
        assert_eq!(clone.version(), ModelVersion::new(1, 3));
    }

    #[test]
    fn test_untrained_snapshot_predicts() {
        let prediction = snapshot(ModelVersion::initial())
            .predict(&FeatureVector::new([0.5; 12]))
            .unwrap();
        assert!(prediction.calibrated.confidence > 0.0);
        assert!((0.0..=1.0).contains(&prediction.reimbursement_fraction));
    }
}
