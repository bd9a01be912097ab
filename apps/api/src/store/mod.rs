//! Persistent store for generation records.
//!
//! Records are document-shaped and owned exclusively by the single invocation
//! that created them, so plain get/set/update with no transactions is enough.
//! The Postgres implementation keeps each record as one JSONB document:
//!
//! ```sql
//! CREATE TABLE generation_requests (
//!     id          TEXT PRIMARY KEY,
//!     owner_id    TEXT NOT NULL,
//!     doc         JSONB NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! CREATE TABLE generation_responses (
//!     id          TEXT PRIMARY KEY,
//!     request_id  TEXT NOT NULL REFERENCES generation_requests(id),
//!     doc         JSONB NOT NULL,
//!     created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::request::GenerationRequest;
use crate::models::response::GenerationResponse;

/// Store seam for the orchestrator. Responses are write-once: `create_response`
/// is the only mutation, there is no update.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn create_request(&self, request: &GenerationRequest) -> Result<(), AppError>;

    /// Full-document write of status, steps, and intermediate results.
    /// Single-writer-per-id makes read-modify-write safe without locking.
    async fn update_request(&self, request: &GenerationRequest) -> Result<(), AppError>;

    async fn get_request(&self, id: &str) -> Result<Option<GenerationRequest>, AppError>;

    async fn create_response(&self, response: &GenerationResponse) -> Result<(), AppError>;

    async fn get_response(&self, id: &str) -> Result<Option<GenerationResponse>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct PgStore {
    pool: sqlx::PgPool,
}

impl PgStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl GenerationStore for PgStore {
    async fn create_request(&self, request: &GenerationRequest) -> Result<(), AppError> {
        let doc = to_doc(request)?;
        sqlx::query(
            "INSERT INTO generation_requests (id, owner_id, doc) VALUES ($1, $2, $3)",
        )
        .bind(&request.id)
        .bind(&request.owner)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_request(&self, request: &GenerationRequest) -> Result<(), AppError> {
        let doc = to_doc(request)?;
        let result = sqlx::query(
            "UPDATE generation_requests SET doc = $2, updated_at = now() WHERE id = $1",
        )
        .bind(&request.id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Request {} not found",
                request.id
            )));
        }
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<GenerationRequest>, AppError> {
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM generation_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        doc.map(from_doc).transpose()
    }

    async fn create_response(&self, response: &GenerationResponse) -> Result<(), AppError> {
        let doc = serde_json::to_value(response)
            .context("Failed to serialize generation response")
            .map_err(AppError::Internal)?;
        sqlx::query(
            "INSERT INTO generation_responses (id, request_id, doc) VALUES ($1, $2, $3)",
        )
        .bind(&response.id)
        .bind(&response.request_id)
        .bind(&doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_response(&self, id: &str) -> Result<Option<GenerationResponse>, AppError> {
        let doc: Option<Value> =
            sqlx::query_scalar("SELECT doc FROM generation_responses WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        doc.map(|d| {
            serde_json::from_value(d)
                .context("Corrupt generation response document")
                .map_err(AppError::Internal)
        })
        .transpose()
    }
}

fn to_doc(request: &GenerationRequest) -> Result<Value, AppError> {
    serde_json::to_value(request)
        .context("Failed to serialize generation request")
        .map_err(AppError::Internal)
}

fn from_doc(doc: Value) -> Result<GenerationRequest, AppError> {
    serde_json::from_value(doc)
        .context("Corrupt generation request document")
        .map_err(AppError::Internal)
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory implementation for tests
// ────────────────────────────────────────────────────────────────────────────
