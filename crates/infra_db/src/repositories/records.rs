//! Claim and policyholder document repository
//!
//! Documents are kept as JSONB in the shape the intake system writes them;
//! only the identifiers are lifted into columns.

use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

/// A stored document and its key
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub document: Value,
}

/// Repository for claim-intake documents
#[derive(Debug, Clone)]
pub struct RecordRepository {
    pool: PgPool,
}

impl RecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Retrieves a claim document by its identifier
    pub async fn get_claim(&self, id: Uuid) -> Result<DocumentRow, DatabaseError> {
        sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM claims WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Claim", id))
    }

    /// Retrieves a policyholder document by its identifier
    pub async fn get_policyholder(&self, id: Uuid) -> Result<DocumentRow, DatabaseError> {
        sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM policyholders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Policyholder", id))
    }

    /// Every claim document, ordered by id
    pub async fn all_claims(&self) -> Result<Vec<DocumentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DocumentRow>("SELECT id, document FROM claims ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Policyholder documents for the given identifiers; unknown ids are skipped
    pub async fn policyholders(&self, ids: &[Uuid]) -> Result<Vec<DocumentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, document FROM policyholders WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
