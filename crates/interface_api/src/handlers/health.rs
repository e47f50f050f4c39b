//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};

use core_kernel::HealthCheckable;
use tracing::warn;

use crate::dto::HealthResponse;
use crate::AppState;

fn response(state: &AppState, status: &str, message: Option<String>) -> HealthResponse {
    HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model_version: state.service.model().version().to_string(),
        message,
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(response(&state, "healthy", None))
}

/// Message returned when the record store fails its health check
pub const RECORD_STORE_UNAVAILABLE: &str = "record store unavailable";

/// Readiness check (includes the record store)
///
/// Backend failure details go to the log, not the response.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let check = state.service.records().health_check().await;
    if check.is_healthy() {
        (StatusCode::OK, Json(response(&state, "ready", None)))
    } else {
        warn!(
            adapter = %check.adapter_id,
            latency_ms = check.latency_ms,
            detail = check.message.as_deref().unwrap_or("none"),
            "Record store failed readiness check"
        );
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(response(&state, "unavailable", Some(RECORD_STORE_UNAVAILABLE.to_string()))),
        )
    }
}
