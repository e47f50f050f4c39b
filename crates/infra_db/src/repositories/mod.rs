//! Repository implementations over the PostgreSQL schema

pub mod estimations;
pub mod records;

pub use estimations::{EstimationRepository, EstimationRow};
pub use records::{DocumentRow, RecordRepository};
