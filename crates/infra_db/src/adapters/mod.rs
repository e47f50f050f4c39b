//! Port implementations backed by PostgreSQL

pub mod estimations;
pub mod records;

pub use estimations::PostgresEstimationStore;
pub use records::PostgresRecordStore;
