//! HTTP API Layer
//!
//! REST API for reimbursement estimation using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: `POST /predict` and the health checks
//! - **Middleware**: request logging and tracing
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: estimation errors mapped to status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(service));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_estimation::EstimationService;

use crate::handlers::{health, predict};
use crate::middleware::request_log_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: EstimationService,
}

impl AppState {
    pub fn new(service: EstimationService) -> Self {
        Self { service }
    }
}

/// Creates the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/predict", post(predict::predict))
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .layer(axum_middleware::from_fn(request_log_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
