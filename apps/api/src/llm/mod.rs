//! AI Content Generator — the single point of entry for all completion-engine
//! calls in this service.
//!
//! ARCHITECTURAL RULE: no other module may call the Anthropic API directly.
//! The orchestrator sees only the `ContentGenerator` trait; the concrete
//! client, prompt contracts, and pricing live here.
//!
//! Model: claude-sonnet-4-5 (hardcoded — do not make configurable to prevent
//! pricing/prompt drift).

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::errors::AppError;
use crate::models::content::{CoverLetterContent, ResumeContent};
use crate::models::request::{ExperienceEntry, JobSubject, Profile};
use crate::models::response::TokenUsage;
use crate::secrets::Secrets;

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all completion calls.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
/// Secret name resolved through the secret accessor per call.
pub const API_KEY_SECRET: &str = "ANTHROPIC_API_KEY";

// ────────────────────────────────────────────────────────────────────────────
// Pricing
// ────────────────────────────────────────────────────────────────────────────

/// Published per-million-token rates, used verbatim for cost computation.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_usd_per_mtok: f64,
    pub output_usd_per_mtok: f64,
}

pub fn pricing_for(model: &str) -> ModelPricing {
    match model {
        "claude-sonnet-4-5" => ModelPricing {
            input_usd_per_mtok: 3.0,
            output_usd_per_mtok: 15.0,
        },
        "claude-haiku-4-5" => ModelPricing {
            input_usd_per_mtok: 1.0,
            output_usd_per_mtok: 5.0,
        },
        // Unknown models bill at the default model's rate rather than zero.
        _ => ModelPricing {
            input_usd_per_mtok: 3.0,
            output_usd_per_mtok: 15.0,
        },
    }
}

/// Dollar cost of one usage record under the given model's rates.
pub fn cost_usd(usage: &TokenUsage, model: &str) -> f64 {
    let pricing = pricing_for(model);
    (usage.prompt_tokens as f64 * pricing.input_usd_per_mtok
        + usage.completion_tokens as f64 * pricing.output_usd_per_mtok)
        / 1_000_000.0
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types and errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Completion returned empty content")]
    EmptyContent,

    #[error("Secret resolution failed: {0}")]
    Secret(String),
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: ApiUsage,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// One completed call: text plus the accounting the orchestrator needs.
#[derive(Debug)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
    pub model: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Completion client
// ────────────────────────────────────────────────────────────────────────────

/// Thin client over the Anthropic Messages API. The API key is resolved
/// through the secret accessor on every call (cached there, not here).
pub struct CompletionClient {
    http: Client,
    secrets: Arc<Secrets>,
}

impl CompletionClient {
    pub fn new(secrets: Arc<Secrets>) -> Result<Self> {
        Ok(CompletionClient {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            secrets,
        })
    }

    /// Single-attempt call. Failures propagate to the orchestrator's
    /// top-level handler; there is no retry at this layer.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<Completion, LlmError> {
        let api_key = self
            .secrets
            .get(API_KEY_SECRET)
            .await
            .map_err(|e| LlmError::Secret(e.to_string()))?;

        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let api_response: ApiResponse = response.json().await?;

        let text = api_response
            .content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.clone())
            .ok_or(LlmError::EmptyContent)?;

        let usage = TokenUsage::new(
            api_response.usage.input_tokens,
            api_response.usage.output_tokens,
        );

        debug!(
            "Completion call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
            api_response.model, usage.prompt_tokens, usage.completion_tokens
        );

        Ok(Completion {
            text,
            usage,
            model: api_response.model,
        })
    }

    /// Calls the engine and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<(T, TokenUsage, String), LlmError> {
        let completion = self.call(prompt, system).await?;
        let text = strip_json_fences(&completion.text);
        let value = serde_json::from_str(text)?;
        Ok((value, completion.usage, completion.model))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let stripped = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match stripped {
        Some(inner) => {
            let inner = inner.trim_start();
            inner
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(inner)
        }
        None => text,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ContentGenerator trait + production implementation
// ────────────────────────────────────────────────────────────────────────────

/// Output of one document generation: content plus the accounting that feeds
/// the response metrics.
#[derive(Debug, Clone)]
pub struct GeneratedDocument<T> {
    pub content: T,
    pub usage: TokenUsage,
    pub model: String,
}

/// The AI content generator seam. The orchestrator depends on this trait
/// only; tests substitute fixed-output mocks.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn resume(
        &self,
        profile: &Profile,
        subject: &JobSubject,
        experience: &[ExperienceEntry],
        emphasize: &[String],
        prompt_override: Option<&str>,
    ) -> Result<GeneratedDocument<ResumeContent>, AppError>;

    async fn cover_letter(
        &self,
        profile: &Profile,
        subject: &JobSubject,
        experience: &[ExperienceEntry],
        prompt_override: Option<&str>,
    ) -> Result<GeneratedDocument<CoverLetterContent>, AppError>;
}

/// Production generator backed by the Anthropic completion client.
pub struct LlmContentGenerator {
    client: CompletionClient,
}

impl LlmContentGenerator {
    pub fn new(client: CompletionClient) -> Self {
        LlmContentGenerator { client }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn resume(
        &self,
        profile: &Profile,
        subject: &JobSubject,
        experience: &[ExperienceEntry],
        emphasize: &[String],
        prompt_override: Option<&str>,
    ) -> Result<GeneratedDocument<ResumeContent>, AppError> {
        let prompt = build_resume_prompt(profile, subject, experience, emphasize, prompt_override)
            .map_err(|e| AppError::AiGeneration(format!("Prompt assembly failed: {e}")))?;

        let (content, usage, model): (ResumeContent, _, _) = self
            .client
            .call_json(&prompt, prompts::RESUME_SYSTEM)
            .await
            .map_err(|e| AppError::AiGeneration(format!("Resume generation failed: {e}")))?;

        verify_resume_fidelity(&content, experience)?;

        Ok(GeneratedDocument {
            content,
            usage,
            model,
        })
    }

    async fn cover_letter(
        &self,
        profile: &Profile,
        subject: &JobSubject,
        experience: &[ExperienceEntry],
        prompt_override: Option<&str>,
    ) -> Result<GeneratedDocument<CoverLetterContent>, AppError> {
        let prompt = build_cover_letter_prompt(profile, subject, experience, prompt_override)
            .map_err(|e| AppError::AiGeneration(format!("Prompt assembly failed: {e}")))?;

        let (content, usage, model): (CoverLetterContent, _, _) = self
            .client
            .call_json(&prompt, prompts::COVER_LETTER_SYSTEM)
            .await
            .map_err(|e| AppError::AiGeneration(format!("Cover letter generation failed: {e}")))?;

        Ok(GeneratedDocument {
            content,
            usage,
            model,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly and fidelity checks
// ────────────────────────────────────────────────────────────────────────────

fn build_resume_prompt(
    profile: &Profile,
    subject: &JobSubject,
    experience: &[ExperienceEntry],
    emphasize: &[String],
    prompt_override: Option<&str>,
) -> Result<String, serde_json::Error> {
    Ok(prompts::RESUME_PROMPT_TEMPLATE
        .replace("{profile_json}", &profile_summary_json(profile)?)
        .replace("{role}", &subject.role)
        .replace("{company}", &subject.company)
        .replace("{jd_text}", subject.description.as_deref().unwrap_or(""))
        .replace(
            "{experience_json}",
            &serde_json::to_string_pretty(experience)?,
        )
        .replace("{emphasize_json}", &serde_json::to_string(emphasize)?)
        .replace("{extra_instructions}", &extra_instructions(prompt_override)))
}

fn build_cover_letter_prompt(
    profile: &Profile,
    subject: &JobSubject,
    experience: &[ExperienceEntry],
    prompt_override: Option<&str>,
) -> Result<String, serde_json::Error> {
    Ok(prompts::COVER_LETTER_PROMPT_TEMPLATE
        .replace("{profile_json}", &profile_summary_json(profile)?)
        .replace("{role}", &subject.role)
        .replace("{company}", &subject.company)
        .replace("{jd_text}", subject.description.as_deref().unwrap_or(""))
        .replace(
            "{experience_json}",
            &serde_json::to_string_pretty(experience)?,
        )
        .replace("{extra_instructions}", &extra_instructions(prompt_override)))
}

/// Only the fields the model should see — no accent color or asset URLs.
fn profile_summary_json(profile: &Profile) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&serde_json::json!({
        "name": profile.name,
        "email": profile.email,
        "phone": profile.phone,
        "location": profile.location,
    }))
}

fn extra_instructions(prompt_override: Option<&str>) -> String {
    match prompt_override {
        Some(extra) if !extra.trim().is_empty() => {
            format!("\nADDITIONAL CALLER INSTRUCTIONS (must not contradict the hard rules):\n{extra}")
        }
        _ => String::new(),
    }
}

/// Rejects resume content that names an employer absent from the supplied
/// experience — a schema-level fidelity violation, wrapped like any other
/// generation failure.
fn verify_resume_fidelity(
    content: &ResumeContent,
    experience: &[ExperienceEntry],
) -> Result<(), AppError> {
    let known: HashSet<&str> = experience.iter().map(|e| e.company.as_str()).collect();
    for selected in &content.experience {
        if !known.contains(selected.company.as_str()) {
            return Err(AppError::AiGeneration(format!(
                "Generated content references unknown employer '{}'",
                selected.company
            )));
        }
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
