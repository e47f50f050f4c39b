//! API configuration
//!
//! Every field can be set through an `API_`-prefixed environment variable
//! (`API_PORT`, `API_MODEL_DIR`, `API_RECORD_BACKEND`, ...); anything unset
//! keeps its default.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use domain_estimation::adapters::SnapshotFiles;
use domain_features::ExtractionConfig;
use domain_model::TrainingConfig;

/// Where claims and policyholders are read from, and estimates stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordBackend {
    /// PostgreSQL tables; requires `database_url`
    Postgres,
    /// JSON snapshot files held in memory; estimates do not survive restarts
    Snapshot,
}

/// Where the retrainer reads labelled samples from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingSource {
    /// The JSON snapshot files
    Snapshot,
    /// The live record store
    Live,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Log level
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
    pub record_backend: RecordBackend,
    /// Database URL, used by the postgres backend
    pub database_url: Option<String>,
    /// Directory holding the persisted model artifact
    pub model_dir: PathBuf,
    pub training_source: TrainingSource,
    pub snapshot_policyholders: PathBuf,
    pub snapshot_claims: PathBuf,
    /// Seconds between scheduled retrains
    pub retrain_interval_secs: u64,
    /// Fewest labelled samples worth retraining on
    pub min_samples: usize,
    /// Calibration temperature
    pub temperature: f32,
    /// IANA timezone for birth dates stored without an offset
    pub timezone: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        let files = SnapshotFiles::default();
        let training = TrainingConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_json: false,
            record_backend: RecordBackend::Snapshot,
            database_url: None,
            model_dir: PathBuf::from("models"),
            training_source: TrainingSource::Snapshot,
            snapshot_policyholders: files.policyholders,
            snapshot_claims: files.claims,
            retrain_interval_secs: 86_400,
            min_samples: training.min_samples,
            temperature: training.temperature,
            timezone: "UTC".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retrain_interval(&self) -> Duration {
        Duration::from_secs(self.retrain_interval_secs.max(1))
    }

    pub fn snapshot_files(&self) -> SnapshotFiles {
        SnapshotFiles {
            policyholders: self.snapshot_policyholders.clone(),
            claims: self.snapshot_claims.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Message` if `timezone` is not an IANA name
    pub fn extraction(&self) -> Result<ExtractionConfig, config::ConfigError> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            config::ConfigError::Message(format!("unknown timezone '{}'", self.timezone))
        })?;
        Ok(ExtractionConfig { timezone })
    }

    pub fn training(&self) -> TrainingConfig {
        TrainingConfig {
            min_samples: self.min_samples,
            temperature: self.temperature,
            ..TrainingConfig::default()
        }
    }
}
