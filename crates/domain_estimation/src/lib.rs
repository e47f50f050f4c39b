//! Estimation Domain
//!
//! Serves reimbursement estimates and keeps the model fresh.
//!
//! # Request flow
//!
//! ```text
//! request -> cache hit? -> return stored estimate
//!         -> load claim + policyholder -> ownership check
//!         -> snapshot model -> extract -> preprocess -> forward -> calibrate
//!         -> insert-if-absent -> return the stored estimate
//! ```
//!
//! Retraining runs on a background task and publishes new model snapshots
//! through the shared [`ModelHandle`]; in-flight requests keep the snapshot
//! they started with.

pub mod adapters;
pub mod error;
pub mod estimation;
pub mod handle;
pub mod ports;
pub mod retrain;
pub mod service;

pub use error::{ErrorKind, EstimationError, RetrainError};
pub use estimation::{Estimation, ReimbursementRequest};
pub use handle::{ModelHandle, ModelSnapshot, Prediction};
pub use ports::{EstimationStore, RecordStore, TrainingDataSource};
pub use retrain::{RetrainOutcome, Retrainer};
pub use service::EstimationService;
