//! Stored estimate repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Database representation of a stored estimate
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct EstimationRow {
    pub estimation_id: Uuid,
    pub claim_id: Uuid,
    pub policyholder_id: Uuid,
    pub reimbursement_class: String,
    pub confidence: f64,
    pub reimbursement_amount: f64,
    pub model_version: String,
    pub created_at: DateTime<Utc>,
}

const COLUMNS: &str = "estimation_id, claim_id, policyholder_id, reimbursement_class, \
                       confidence, reimbursement_amount, model_version, created_at";

/// Repository for write-once estimates
#[derive(Debug, Clone)]
pub struct EstimationRepository {
    pool: PgPool,
}

impl EstimationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_by_claim(&self, claim_id: Uuid) -> Result<Option<EstimationRow>, DatabaseError> {
        let row = sqlx::query_as::<_, EstimationRow>(&format!(
            "SELECT {COLUMNS} FROM estimations WHERE claim_id = $1"
        ))
        .bind(claim_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Inserts `row` unless its claim already has an estimate
    ///
    /// # Returns
    ///
    /// The row stored for the claim afterwards, which is the existing one
    /// when another writer got there first.
    pub async fn insert_if_absent(&self, row: &EstimationRow) -> Result<EstimationRow, DatabaseError> {
        let inserted = sqlx::query_as::<_, EstimationRow>(&format!(
            r#"
            INSERT INTO estimations ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (claim_id) DO NOTHING
            RETURNING {COLUMNS}
            "#
        ))
        .bind(row.estimation_id)
        .bind(row.claim_id)
        .bind(row.policyholder_id)
        .bind(&row.reimbursement_class)
        .bind(row.confidence)
        .bind(row.reimbursement_amount)
        .bind(&row.model_version)
        .bind(row.created_at)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(stored) => Ok(stored),
            None => self
                .find_by_claim(row.claim_id)
                .await?
                .ok_or_else(|| DatabaseError::not_found("Estimation", row.claim_id)),
        }
    }
}
