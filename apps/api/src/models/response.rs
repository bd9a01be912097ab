//! Generation response record — the outcome, one-to-one with a request.
//! Created exactly once at the end of a run (success or failure) and never
//! updated afterward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::content::{CoverLetterContent, ResumeContent};

/// Token counts for one AI completion call, the basis for cost computation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        TokenUsage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn plus(self, other: &TokenUsage) -> TokenUsage {
        TokenUsage::new(
            self.prompt_tokens + other.prompt_tokens,
            self.completion_tokens + other.completion_tokens,
        )
    }
}

/// Per-document usage plus the grand total.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageBreakdown {
    pub by_document: BTreeMap<String, TokenUsage>,
    pub total: TokenUsage,
}

impl UsageBreakdown {
    pub fn from_map(by_document: BTreeMap<String, TokenUsage>) -> Self {
        let total = by_document
            .values()
            .fold(TokenUsage::default(), |acc, u| acc.plus(u));
        UsageBreakdown { by_document, total }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    pub duration_ms: u64,
    pub token_usage: UsageBreakdown,
    pub cost_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Location metadata for one uploaded artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
    pub size_bytes: u64,
    pub storage_class: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratedFiles {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ArtifactRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<ArtifactRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub code: String,
}

/// Success carries the generated content; failure carries the error detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<CoverLetterContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl GenerationResult {
    pub fn succeeded(
        resume: Option<ResumeContent>,
        cover_letter: Option<CoverLetterContent>,
    ) -> Self {
        GenerationResult {
            success: true,
            resume,
            cover_letter,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>, code: impl Into<String>) -> Self {
        GenerationResult {
            success: false,
            resume: None,
            cover_letter: None,
            error: Some(ErrorDetail {
                message: message.into(),
                code: code.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub id: String,
    pub request_id: String,
    pub result: GenerationResult,
    pub metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<GeneratedFiles>,
    pub created_at: DateTime<Utc>,
}
