//! Prediction handler

use axum::{extract::State, Json};
use tracing::instrument;

use crate::dto::{PredictRequest, PredictResponse};
use crate::{error::ApiError, AppState};

/// Returns the reimbursement estimate for a claim
///
/// The first request for a claim computes and stores the estimate; later
/// requests return the stored one.
#[instrument(skip(state, request))]
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = request.into_request()?;
    let estimation = state.service.estimate(request).await?;
    Ok(Json(estimation.into()))
}
