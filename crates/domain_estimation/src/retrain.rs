//! Periodic retraining
//!
//! A retrain loads labelled samples, trains on a blocking thread, and
//! publishes the new checkpoint through the [`ModelHandle`]. Any failure
//! leaves the serving model and the persisted artifact as they were.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, instrument, warn};

use domain_features::FeatureExtractor;
use domain_model::{
    ArtifactStore, EvaluationReport, ModelVersion, TemperatureCalibrator, TrainingConfig, TrainingPipeline,
};

use crate::error::RetrainError;
use crate::handle::{ModelHandle, ModelSnapshot};
use crate::ports::TrainingDataSource;

/// What a retrain attempt did
#[derive(Debug, Clone, PartialEq)]
pub enum RetrainOutcome {
    /// Too few labelled samples; nothing was trained
    Skipped { labeled: usize, required: usize },
    /// Another retrain was still running
    AlreadyRunning,
    /// Training ran but no validation check produced a checkpoint
    NoCheckpoint { report: EvaluationReport },
    /// A new model is now serving
    Retrained {
        version: ModelVersion,
        report: EvaluationReport,
        excluded: usize,
    },
}

pub struct Retrainer {
    source: Arc<dyn TrainingDataSource>,
    artifacts: Arc<dyn ArtifactStore>,
    handle: ModelHandle,
    config: TrainingConfig,
    extractor: FeatureExtractor,
    running: Mutex<()>,
}

impl Retrainer {
    pub fn new(
        source: Arc<dyn TrainingDataSource>,
        artifacts: Arc<dyn ArtifactStore>,
        handle: ModelHandle,
        config: TrainingConfig,
        extractor: FeatureExtractor,
    ) -> Self {
        Self {
            source,
            artifacts,
            handle,
            config,
            extractor,
            running: Mutex::new(()),
        }
    }

    /// Runs one retrain attempt
    ///
    /// # Errors
    ///
    /// Loading or training failures; the serving model is unchanged.
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn run_once(&self) -> Result<RetrainOutcome, RetrainError> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Previous retrain still running, skipping");
            return Ok(RetrainOutcome::AlreadyRunning);
        };

        let samples = self.source.load_samples().await?;
        let labeled = samples.iter().filter(|s| s.is_labeled()).count();
        if labeled < self.config.min_samples {
            info!(labeled, required = self.config.min_samples, "Not enough labelled samples, skipping retrain");
            return Ok(RetrainOutcome::Skipped {
                labeled,
                required: self.config.min_samples,
            });
        }

        info!(labeled, "Starting retrain");
        let pipeline = TrainingPipeline::new(self.config.clone(), self.extractor);
        let artifacts = Arc::clone(&self.artifacts);
        let outcome = tokio::task::spawn_blocking(move || pipeline.run(samples, artifacts.as_ref()))
            .await
            .map_err(|e| RetrainError::Join(e.to_string()))??;

        let Some(artifact) = outcome.artifact else {
            warn!("Retrain produced no checkpoint, keeping current model");
            return Ok(RetrainOutcome::NoCheckpoint {
                report: outcome.report,
            });
        };

        let calibrator = TemperatureCalibrator::new(self.config.temperature)
            .map_err(|e| RetrainError::Training(e.into()))?;
        let version = artifact.version;
        self.handle.swap(ModelSnapshot::new(artifact, calibrator));
        info!(%version, accuracy = outcome.report.classification.accuracy, "Retrain complete");

        Ok(RetrainOutcome::Retrained {
            version,
            report: outcome.report,
            excluded: outcome.excluded.len(),
        })
    }

    /// Retrains every `period` on a background task; the first run happens
    /// one full period after start
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.run_once().await {
                    Ok(outcome) => info!(?outcome, "Scheduled retrain finished"),
                    Err(e) => error!(error = %e, "Scheduled retrain failed"),
                }
            }
        })
    }
}
