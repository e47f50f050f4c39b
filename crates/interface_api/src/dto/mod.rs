//! Request and response bodies

pub mod health;
pub mod predict;

pub use health::HealthResponse;
pub use predict::{PredictRequest, PredictResponse};
