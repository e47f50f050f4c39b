//! Reimbursement Model Domain
//!
//! The learning side of the estimator: a standard-scaling preprocessor, a
//! feed-forward network with independent classifier and regressor heads,
//! the offline training pipeline, temperature calibration, and the
//! versioned artifact that ties weights and scaler together.
//!
//! # Training flow
//!
//! ```text
//! samples -> extract -> fit scaler -> stratified split -> class weights
//!         -> [epoch: Adam step | every N: validate, decay LR, checkpoint?, early stop?]
//!         -> restore best -> test report
//! ```

pub mod artifact;
pub mod calibration;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod preprocessor;
pub mod split;
pub mod training;

pub use artifact::{ArtifactStore, FileArtifactStore, MemoryArtifactStore, ModelArtifact, ModelVersion};
pub use calibration::{Calibrated, TemperatureCalibrator, DEFAULT_TEMPERATURE, MIN_TEMPERATURE};
pub use error::{ArtifactError, ModelError, TrainingError};
pub use loss::ClassWeights;
pub use metrics::{ClassificationMetrics, ConfidenceSummary, ConfusionMatrix, EvaluationReport};
pub use network::{DualHeadModel, HeadOutputs};
pub use optimizer::{Adam, PlateauScheduler};
pub use preprocessor::Preprocessor;
pub use split::{stratified_split, SplitIndices};
pub use training::{
    ExcludedSample, ExclusionReason, LabeledSample, TrainingConfig, TrainingOutcome, TrainingPipeline,
};
