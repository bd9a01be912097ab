//! Axum route handlers for the generation pipeline.
//!
//! Identity verification happens upstream; handlers trust the authenticated
//! subject id forwarded in `X-User-Id` and enforce ownership against it.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::request::{
    DocumentKind, ExperienceEntry, GenerationRequest, JobSubject, Profile,
};
use crate::models::response::{ErrorDetail, GenerationResponse};
use crate::pipeline::orchestrator::GenerateOptions;
use crate::state::AppState;

const USER_ID_HEADER: &str = "x-user-id";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateApiRequest {
    pub kind: DocumentKind,
    pub subject: JobSubject,
    pub profile: Profile,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub job_match_id: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub prompt_override: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Preferences {
    /// Skills to prioritize during content selection.
    #[serde(default)]
    pub emphasize: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateApiResponse {
    pub request_id: String,
    pub response_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_letter_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/generate
///
/// Runs the full pipeline to completion within this request. A pipeline
/// failure still returns 200 with the request id and a coarse error code —
/// progress up to the failure point stays inspectable via the request record.
pub async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<GenerateApiRequest>,
) -> Result<Json<GenerateApiResponse>, AppError> {
    let owner = authenticated_user(&headers)?;

    let outcome = state
        .orchestrator
        .generate(GenerateOptions {
            kind: request.kind,
            subject: request.subject,
            profile: request.profile,
            experience: request.experience,
            owner,
            job_match_id: request.job_match_id,
            emphasize: request.preferences.emphasize,
            style: request.style,
            prompt_override: request.prompt_override,
        })
        .await?;

    Ok(Json(GenerateApiResponse {
        request_id: outcome.request_id,
        response_id: outcome.response_id,
        resume_url: outcome.resume_url,
        cover_letter_url: outcome.cover_letter_url,
        error: outcome.error,
    }))
}

/// GET /api/v1/requests/:id
///
/// Read-only status/progress poll. Mismatched ownership reads as not-found
/// so request ids cannot be probed.
pub async fn handle_get_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(request_id): Path<String>,
) -> Result<Json<GenerationRequest>, AppError> {
    let owner = authenticated_user(&headers)?;

    let request = state
        .orchestrator
        .get_request(&request_id)
        .await?
        .filter(|r| r.owner == owner)
        .ok_or_else(|| AppError::NotFound(format!("Request {request_id} not found")))?;

    Ok(Json(request))
}

/// GET /api/v1/responses/:id
///
/// Ownership is cross-checked against the response's backing request.
pub async fn handle_get_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(response_id): Path<String>,
) -> Result<Json<GenerationResponse>, AppError> {
    let owner = authenticated_user(&headers)?;
    let not_found = || AppError::NotFound(format!("Response {response_id} not found"));

    let response = state
        .orchestrator
        .get_response(&response_id)
        .await?
        .ok_or_else(not_found)?;

    let request = state
        .orchestrator
        .get_request(&response.request_id)
        .await?
        .filter(|r| r.owner == owner)
        .ok_or_else(not_found)?;
    debug_assert_eq!(request.id, response.request_id);

    Ok(Json(response))
}

fn authenticated_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
        .ok_or(AppError::Unauthorized)
}
