//! End-to-end workflow: retrain from records, persist, serve, restart

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

use domain_estimation::adapters::{InMemoryEstimationStore, InMemoryRecordStore, RecordStoreSource};
use domain_estimation::{EstimationService, ModelHandle, ModelSnapshot, RetrainOutcome, Retrainer};
use domain_features::FeatureExtractor;
use domain_model::{ArtifactStore, FileArtifactStore, ModelArtifact, TemperatureCalibrator, TrainingConfig};
use interface_api::dto::PredictResponse;
use interface_api::{create_router, AppState};
use test_utils::{CorpusFixtures, IdFixtures};

#[tokio::test]
async fn test_retrained_model_is_served_and_survives_restart() {
    let dir = TempDir::new().unwrap();
    let (claims, holders): (Vec<_>, Vec<_>) = CorpusFixtures::labeled(60).into_iter().unzip();
    let records = Arc::new(InMemoryRecordStore::with_records(claims, holders));
    let artifacts = Arc::new(FileArtifactStore::new(dir.path()));
    let handle = ModelHandle::new(ModelSnapshot::new(
        ModelArtifact::untrained(42),
        TemperatureCalibrator::default(),
    ));

    let retrainer = Retrainer::new(
        Arc::new(RecordStoreSource::new(records.clone())),
        artifacts.clone(),
        handle.clone(),
        TrainingConfig::default(),
        FeatureExtractor::default(),
    );
    let outcome = retrainer.run_once().await.unwrap();
    let RetrainOutcome::Retrained { version, .. } = outcome else {
        panic!("expected a retrain, got {outcome:?}");
    };

    let service = EstimationService::new(
        records,
        Arc::new(InMemoryEstimationStore::new()),
        handle,
        FeatureExtractor::default(),
    );
    let app = create_router(AppState::new(service));
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "claimId": IdFixtures::claim_id_n(4).to_string(),
                "policyholderId": IdFixtures::policyholder_id_n(4).to_string(),
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let predicted: PredictResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(predicted.model_version, version.to_string());

    let reloaded = FileArtifactStore::new(dir.path()).load().unwrap().unwrap();
    assert_eq!(reloaded.version, version);
    assert!(reloaded.is_fitted());
}
