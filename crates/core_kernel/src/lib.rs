//! Core Kernel - Foundational types shared by the reimbursement estimator
//!
//! This crate provides the building blocks used across all domain crates:
//! - Strongly-typed identifiers for claims, policyholders and estimations
//! - The kernel error type
//! - Port infrastructure (errors, marker traits, health checks) for adapters

pub mod identifiers;
pub mod error;
pub mod ports;

pub use identifiers::{ClaimId, PolicyholderId, EstimationId};
pub use error::CoreError;
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
