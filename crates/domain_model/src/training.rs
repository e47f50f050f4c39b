//! Offline training pipeline
//!
//! Turns labelled claim records into a checkpointed [`ModelArtifact`]. The
//! run is deterministic for a fixed seed, sample order and reference time.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use core_kernel::ClaimId;
use domain_features::coerce;
use domain_features::{
    ClaimRecord, FeatureExtractionError, FeatureExtractor, FeatureVector, PolicyholderRecord,
    ReimbursementClass,
};

use crate::artifact::{ArtifactStore, ModelArtifact, ModelVersion};
use crate::calibration::{TemperatureCalibrator, DEFAULT_TEMPERATURE};
use crate::error::TrainingError;
use crate::loss::{cross_entropy, ClassWeights, LossAccumulator, LossBreakdown};
use crate::metrics::{ClassificationMetrics, ConfidenceSummary, ConfusionMatrix, EvaluationReport};
use crate::network::{DualHeadModel, DEFAULT_DROPOUT};
use crate::optimizer::{Adam, PlateauScheduler};
use crate::preprocessor::Preprocessor;
use crate::split::{stratified_split, SplitIndices};

// ============================================================================
// Configuration
// ============================================================================

/// Hyperparameters for one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub max_epochs: usize,
    /// Validate, decay and checkpoint every this many epochs
    pub eval_every: usize,
    pub learning_rate: f32,
    pub weight_decay: f32,
    pub lr_decay_factor: f32,
    /// Validation checks without improvement before the learning rate decays
    pub lr_patience: usize,
    /// Validation checks without improvement before training stops
    pub early_stopping_patience: usize,
    pub seed: u64,
    pub validation_fraction: f64,
    pub test_fraction: f64,
    pub temperature: f32,
    /// Fewest labelled samples worth retraining on
    pub min_samples: usize,
    pub dropout: f32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            max_epochs: 30,
            eval_every: 5,
            learning_rate: 1e-3,
            weight_decay: 1e-4,
            lr_decay_factor: 0.5,
            lr_patience: 5,
            early_stopping_patience: 10,
            seed: 42,
            validation_fraction: 0.15,
            test_fraction: 0.15,
            temperature: DEFAULT_TEMPERATURE,
            min_samples: 50,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

// ============================================================================
// Samples
// ============================================================================

/// A historical claim with its policyholder, if the policyholder was found
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSample {
    pub claim: ClaimRecord,
    pub policyholder: Option<PolicyholderRecord>,
}

impl LabeledSample {
    pub fn new(claim: ClaimRecord, policyholder: Option<PolicyholderRecord>) -> Self {
        Self { claim, policyholder }
    }

    /// True when the claim carries a class label of any kind
    pub fn is_labeled(&self) -> bool {
        self.claim.reimbursement_class().is_some()
    }
}

/// Why a sample was left out of training
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExclusionReason {
    #[error("policyholder record not found")]
    MissingPolicyholder,

    #[error("claim has no reimbursement class")]
    MissingLabel,

    #[error("unrecognized reimbursement class: {0}")]
    UnrecognizedLabel(String),

    #[error(transparent)]
    Extraction(FeatureExtractionError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExcludedSample {
    pub claim_id: ClaimId,
    pub reason: ExclusionReason,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Best checkpoint, `None` if no validation check ever improved
    pub artifact: Option<ModelArtifact>,
    pub report: EvaluationReport,
    pub epochs_run: usize,
    pub best_validation_loss: Option<f32>,
    pub samples_used: usize,
    pub excluded: Vec<ExcludedSample>,
    pub class_weights: ClassWeights,
}

impl TrainingOutcome {
    pub fn version(&self) -> Option<ModelVersion> {
        self.artifact.as_ref().map(|a| a.version)
    }
}

/// Extracted features with their targets
#[derive(Debug, Default)]
struct Dataset {
    features: Vec<FeatureVector>,
    labels: Vec<ReimbursementClass>,
    targets: Vec<f32>,
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct TrainingPipeline {
    config: TrainingConfig,
    extractor: FeatureExtractor,
    reference_time: Option<DateTime<Utc>>,
}

impl TrainingPipeline {
    pub fn new(config: TrainingConfig, extractor: FeatureExtractor) -> Self {
        Self {
            config,
            extractor,
            reference_time: None,
        }
    }

    /// Computes ages against `as_of` instead of the current time
    pub fn with_reference_time(mut self, as_of: DateTime<Utc>) -> Self {
        self.reference_time = Some(as_of);
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Trains a fresh model on `samples`, checkpointing improvements to `store`
    ///
    /// # Errors
    ///
    /// [`TrainingError::NoValidSamples`] when every sample is excluded, and
    /// [`TrainingError::Artifact`] when a checkpoint cannot be written.
    #[instrument(skip_all, fields(samples = samples.len()))]
    pub fn run(
        &self,
        samples: Vec<LabeledSample>,
        store: &dyn ArtifactStore,
    ) -> Result<TrainingOutcome, TrainingError> {
        let started = std::time::Instant::now();
        let (raw, excluded) = self.prepare(&samples);
        if raw.features.is_empty() {
            warn!(excluded = excluded.len(), "No usable training samples");
            return Err(TrainingError::NoValidSamples {
                excluded: excluded.len(),
            });
        }

        let preprocessor = Preprocessor::fit(&raw.features)?;
        let data = Dataset {
            features: preprocessor.transform_batch(&raw.features),
            ..raw
        };

        let split = stratified_split(
            &data.labels,
            self.config.validation_fraction,
            self.config.test_fraction,
            self.config.seed,
        );
        let train_labels: Vec<_> = split.train.iter().map(|&i| data.labels[i]).collect();
        let class_weights = ClassWeights::inverse_frequency(&train_labels);
        log_split(&data, &split, &class_weights);

        let validation_rows = if split.validation.is_empty() {
            warn!("Validation split is empty, validating on the training split");
            &split.train
        } else {
            &split.validation
        };

        let mut model = DualHeadModel::with_dropout(self.config.seed, self.config.dropout);
        let mut optimizer = Adam::new(self.config.learning_rate, self.config.weight_decay);
        let mut scheduler = PlateauScheduler::new(self.config.lr_decay_factor, self.config.lr_patience);
        let mut dropout_rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(1));
        let eval_every = self.config.eval_every.max(1);

        let mut last_version = store.current_version()?;
        let mut best_loss: Option<f32> = None;
        let mut best: Option<ModelArtifact> = None;
        let mut stale_checks = 0;
        let mut epochs_run = 0;

        for epoch in 0..self.config.max_epochs {
            let train_loss = train_epoch(
                &mut model,
                &data,
                &split.train,
                &class_weights,
                &mut optimizer,
                &mut dropout_rng,
            );
            epochs_run = epoch + 1;
            debug!(epoch, loss = train_loss.total(), "Epoch finished");

            if epoch % eval_every != 0 {
                continue;
            }

            let validation = evaluate_loss(&model, &data, validation_rows, &class_weights);
            let loss = validation.total();
            scheduler.observe(loss, &mut optimizer);
            info!(
                epoch,
                train_loss = train_loss.total(),
                validation_loss = loss,
                classification = validation.classification,
                regression = validation.regression,
                lr = optimizer.learning_rate(),
                "Validation check"
            );

            if best_loss.map_or(loss.is_finite(), |b| loss < b) {
                let version = last_version.map_or(ModelVersion::initial(), ModelVersion::next);
                let artifact = ModelArtifact {
                    model: model.clone(),
                    preprocessor: Some(preprocessor.clone()),
                    version,
                };
                store.save(&artifact)?;
                info!(epoch, %version, validation_loss = loss, "Checkpoint saved");

                last_version = Some(version);
                best_loss = Some(loss);
                best = Some(artifact);
                stale_checks = 0;
            } else {
                stale_checks += 1;
                if stale_checks >= self.config.early_stopping_patience {
                    info!(epoch, "Early stopping");
                    break;
                }
            }
        }

        if let Some(artifact) = &best {
            model = artifact.model.clone();
        }

        let calibrator = TemperatureCalibrator::new(self.config.temperature)?;
        let report = evaluate(&model, &calibrator, &data, &split.test);
        info!(
            test_samples = report.samples,
            accuracy = report.classification.accuracy,
            precision = report.classification.precision,
            recall = report.classification.recall,
            f1 = report.classification.f1,
            confusion = ?report.classification.confusion.rows(),
            confidence = ?report.confidence,
            fraction_mae = report.fraction_mae,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training finished"
        );

        Ok(TrainingOutcome {
            artifact: best,
            report,
            epochs_run,
            best_validation_loss: best_loss,
            samples_used: data.features.len(),
            excluded,
            class_weights,
        })
    }

    /// Extracts features and targets, setting aside unusable samples
    fn prepare(&self, samples: &[LabeledSample]) -> (Dataset, Vec<ExcludedSample>) {
        let as_of = self.reference_time.unwrap_or_else(Utc::now);
        let mut data = Dataset::default();
        let mut excluded = Vec::new();

        for sample in samples {
            let claim = &sample.claim;
            match self.prepare_one(sample, as_of) {
                Ok((features, label)) => {
                    data.features.push(features);
                    data.labels.push(label);
                    data.targets.push(reimbursement_target(claim));
                }
                Err(reason) => {
                    warn!(claim_id = %claim.id, %reason, "Excluding sample from training");
                    excluded.push(ExcludedSample {
                        claim_id: claim.id,
                        reason,
                    });
                }
            }
        }
        (data, excluded)
    }

    fn prepare_one(
        &self,
        sample: &LabeledSample,
        as_of: DateTime<Utc>,
    ) -> Result<(FeatureVector, ReimbursementClass), ExclusionReason> {
        let holder = sample
            .policyholder
            .as_ref()
            .ok_or(ExclusionReason::MissingPolicyholder)?;
        let label = match sample.claim.reimbursement_class() {
            None => return Err(ExclusionReason::MissingLabel),
            Some(Err(raw)) => return Err(ExclusionReason::UnrecognizedLabel(raw)),
            Some(Ok(label)) => label,
        };
        let extraction = self
            .extractor
            .extract_at(&sample.claim, holder, as_of)
            .map_err(ExclusionReason::Extraction)?;
        Ok((extraction.features, label))
    }
}

/// Reimbursed share of the amount paid, clamped into [0, 1]
fn reimbursement_target(claim: &ClaimRecord) -> f32 {
    let total = claim
        .financial_info
        .as_ref()
        .and_then(|f| coerce::as_number(&f.total_amount_paid))
        .unwrap_or(0.0);
    let reimbursed = claim
        .reimbursement_amount
        .as_ref()
        .and_then(coerce::as_number)
        .unwrap_or(0.0);
    if total > 0.0 {
        (reimbursed / total).clamp(0.0, 1.0) as f32
    } else {
        0.0
    }
}

fn log_split(data: &Dataset, split: &SplitIndices, weights: &ClassWeights) {
    let mut counts = [0usize; ReimbursementClass::COUNT];
    for label in &data.labels {
        counts[label.index()] += 1;
    }
    for class in ReimbursementClass::ALL {
        if counts[class.index()] == 0 {
            warn!(%class, "No training samples for class");
        }
    }
    info!(
        low = counts[0],
        medium = counts[1],
        high = counts[2],
        train = split.train.len(),
        validation = split.validation.len(),
        test = split.test.len(),
        class_weights = ?weights.as_array(),
        "Prepared training data"
    );
}

// ============================================================================
// Epoch and evaluation
// ============================================================================

/// One full-batch optimizer step over `rows` with dropout active
fn train_epoch(
    model: &mut DualHeadModel,
    data: &Dataset,
    rows: &[usize],
    weights: &ClassWeights,
    optimizer: &mut Adam,
    rng: &mut ChaCha8Rng,
) -> LossBreakdown {
    if rows.is_empty() {
        return LossBreakdown::default();
    }

    let weight_sum: f32 = rows.iter().map(|&i| weights.weight(data.labels[i])).sum();
    let n = rows.len() as f32;
    let mut grad = model.zero_grad();
    let mut loss = LossAccumulator::default();

    for &i in rows {
        let features = &data.features[i];
        let label = data.labels[i];
        let trace = model.forward_trace(features, Some(&mut *rng));

        let (nll, mut grad_logits) = cross_entropy(&trace.class_logits(), label);
        let w = weights.weight(label);
        let ce_scale = if weight_sum > 0.0 { w / weight_sum } else { 0.0 };
        grad_logits.iter_mut().for_each(|g| *g *= ce_scale);

        let fraction = trace.reimbursement_fraction();
        let error = fraction - data.targets[i];
        let grad_fraction_raw = 2.0 * error / n * fraction * (1.0 - fraction);

        loss.add(nll, w, error * error);
        model.backward(features, &trace, &grad_logits, grad_fraction_raw, &mut grad);
    }

    optimizer.step(model.params_mut(), grad.slices());
    loss.finish()
}

/// Joint loss in inference mode
fn evaluate_loss(
    model: &DualHeadModel,
    data: &Dataset,
    rows: &[usize],
    weights: &ClassWeights,
) -> LossBreakdown {
    let mut loss = LossAccumulator::default();
    for &i in rows {
        let out = model.forward(&data.features[i]);
        let label = data.labels[i];
        let (nll, _) = cross_entropy(&out.class_logits, label);
        let error = out.reimbursement_fraction - data.targets[i];
        loss.add(nll, weights.weight(label), error * error);
    }
    loss.finish()
}

fn evaluate(
    model: &DualHeadModel,
    calibrator: &TemperatureCalibrator,
    data: &Dataset,
    rows: &[usize],
) -> EvaluationReport {
    let mut pairs = Vec::with_capacity(rows.len());
    let mut confidences = Vec::with_capacity(rows.len());
    let mut abs_error = 0.0f64;

    for &i in rows {
        let out = model.forward(&data.features[i]);
        abs_error += f64::from((out.reimbursement_fraction - data.targets[i]).abs());
        match calibrator.calibrate(&out.class_logits) {
            Ok(calibrated) => {
                pairs.push((data.labels[i], calibrated.class));
                confidences.push(calibrated.confidence);
            }
            Err(e) => warn!(row = i, error = %e, "Skipping test sample"),
        }
    }

    EvaluationReport {
        samples: rows.len(),
        classification: ClassificationMetrics::from_confusion(ConfusionMatrix::from_pairs(pairs)),
        confidence: ConfidenceSummary::from_values(&confidences),
        fraction_mae: if rows.is_empty() {
            0.0
        } else {
            abs_error / rows.len() as f64
        },
    }
}
