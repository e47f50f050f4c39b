//! Model, artifact and training errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the numeric components
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot fit preprocessor on an empty batch")]
    EmptyBatch,

    #[error("Non-finite value in {what}")]
    NonFinite { what: &'static str },

    #[error("Invalid temperature {0}: must be finite and greater than 1")]
    InvalidTemperature(f32),

    #[error("Layer '{layer}' expects {expected} parameters, found {found}")]
    ShapeMismatch {
        layer: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Errors raised while loading or saving model artifacts
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact file {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model version '{0}'")]
    InvalidVersion(String),

    #[error("Artifact pointer {path} names an invalid generation '{name}'")]
    InvalidPointer { path: PathBuf, name: String },

    #[error("Stored model is unusable: {0}")]
    Model(#[from] ModelError),
}

impl ArtifactError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArtifactError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ArtifactError::Serialization {
            path: path.into(),
            source,
        }
    }
}

/// Errors that abort a training run
///
/// Per-sample problems never surface here; they are recorded as exclusions.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("No valid training samples ({excluded} excluded)")]
    NoValidSamples { excluded: usize },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Checkpoint failed: {0}")]
    Artifact(#[from] ArtifactError),
}
