//! Infrastructure Database Layer
//!
//! PostgreSQL storage for the reimbursement estimator using SQLx:
//! claim and policyholder documents as JSONB, and the write-once
//! estimation table keyed by claim.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresRecordStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/reimbursement")).await?;
//! run_migrations(&pool).await?;
//! let records = PostgresRecordStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::{PostgresEstimationStore, PostgresRecordStore};
pub use error::DatabaseError;
pub use pool::{create_pool, ping, run_migrations, DatabaseConfig, DatabasePool};
