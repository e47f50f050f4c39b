//! Reimbursement API - Server Binary
//!
//! Starts the HTTP API and the background retrain schedule.
//!
//! # Usage
//!
//! ```bash
//! # Serve from the JSON snapshot files in ./data
//! cargo run --bin reimbursement-api
//!
//! # Serve from PostgreSQL
//! API_RECORD_BACKEND=postgres API_DATABASE_URL=postgres://... cargo run --bin reimbursement-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `API_RECORD_BACKEND` - `snapshot` (default) or `postgres`
//! * `API_DATABASE_URL` - PostgreSQL connection string, required for `postgres`
//! * `API_MODEL_DIR` - Artifact directory (default: models)
//! * `API_TRAINING_SOURCE` - `snapshot` (default) or `live`
//! * `API_SNAPSHOT_POLICYHOLDERS` / `API_SNAPSHOT_CLAIMS` - Snapshot file paths
//! * `API_RETRAIN_INTERVAL_SECS` - Seconds between retrains (default: 86400)
//! * `API_MIN_SAMPLES` - Labelled samples needed to retrain (default: 50)
//! * `API_TEMPERATURE` - Calibration temperature (default: 2.0)
//! * `API_TIMEZONE` - Timezone for offset-less birth dates (default: UTC)
//! * `API_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::HealthCheckable;
use domain_estimation::adapters::{
    InMemoryEstimationStore, InMemoryRecordStore, JsonSnapshotSource, RecordStoreSource, Snapshot,
};
use domain_estimation::{
    EstimationService, EstimationStore, ModelHandle, ModelSnapshot, RecordStore, Retrainer,
    TrainingDataSource,
};
use domain_features::FeatureExtractor;
use domain_model::{ArtifactStore, FileArtifactStore, ModelArtifact, TemperatureCalibrator};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresEstimationStore, PostgresRecordStore};
use interface_api::config::{ApiConfig, RecordBackend, TrainingSource};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        backend = ?config.record_backend,
        "Starting reimbursement API server"
    );

    let extractor = FeatureExtractor::new(config.extraction()?);
    let (records, estimations) = open_stores(&config).await?;

    let health = records.health_check().await;
    if !health.is_healthy() {
        bail!(
            "record store unreachable: {}",
            health.message.unwrap_or_else(|| "no details".to_string())
        );
    }

    let training = config.training();
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(&config.model_dir));
    let artifact = load_artifact(Arc::clone(&artifacts), training.seed).await;
    let calibrator = TemperatureCalibrator::new(training.temperature)?;
    let handle = ModelHandle::new(ModelSnapshot::new(artifact, calibrator));
    tracing::info!(model_version = %handle.version(), "Model ready");

    let source: Arc<dyn TrainingDataSource> = match config.training_source {
        TrainingSource::Snapshot => Arc::new(JsonSnapshotSource::new(config.snapshot_files())),
        TrainingSource::Live => Arc::new(RecordStoreSource::new(Arc::clone(&records))),
    };
    let retrainer = Arc::new(Retrainer::new(
        source,
        artifacts,
        handle.clone(),
        training,
        extractor,
    ));
    let retrain_task = retrainer.spawn(config.retrain_interval());

    let service = EstimationService::new(records, estimations, handle, extractor);
    let app = create_router(AppState::new(service));

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    retrain_task.abort();
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Opens the record and estimation stores for the configured backend.
async fn open_stores(
    config: &ApiConfig,
) -> anyhow::Result<(Arc<dyn RecordStore>, Arc<dyn EstimationStore>)> {
    match config.record_backend {
        RecordBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("API_DATABASE_URL is required for the postgres backend")?;
            let pool = create_pool(DatabaseConfig::new(url)).await?;
            run_migrations(&pool).await?;
            let records: Arc<dyn RecordStore> = Arc::new(PostgresRecordStore::new(pool.clone()));
            let estimations: Arc<dyn EstimationStore> = Arc::new(PostgresEstimationStore::new(pool));
            Ok((records, estimations))
        }
        RecordBackend::Snapshot => {
            let snapshot = Snapshot::load(&config.snapshot_files())
                .await
                .context("failed to read snapshot files")?;
            tracing::info!(
                claims = snapshot.claims.len(),
                policyholders = snapshot.policyholders.len(),
                skipped = snapshot.skipped,
                "Loaded record snapshot"
            );
            let records: Arc<dyn RecordStore> =
                Arc::new(InMemoryRecordStore::with_records(snapshot.claims, snapshot.policyholders));
            let estimations: Arc<dyn EstimationStore> = Arc::new(InMemoryEstimationStore::new());
            Ok((records, estimations))
        }
    }
}

/// Loads the persisted model, falling back to an untrained one.
async fn load_artifact(artifacts: Arc<dyn ArtifactStore>, seed: u64) -> ModelArtifact {
    let loaded = tokio::task::spawn_blocking(move || artifacts.load()).await;
    match loaded {
        Ok(Ok(Some(artifact))) => artifact,
        Ok(Ok(None)) => {
            tracing::warn!("No persisted model found, serving an untrained model");
            ModelArtifact::untrained(seed)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Persisted model unreadable, serving an untrained model");
            ModelArtifact::untrained(seed)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Model load task failed, serving an untrained model");
            ModelArtifact::untrained(seed)
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
