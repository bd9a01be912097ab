//! Generation request record — the unit of work driven through the pipeline.
//!
//! The stage sequence is an explicit enum with a total `next()` function, so a
//! skipped stage is unrepresentable. The persisted `steps` list is derived from
//! `Stage::ALL` and is append-only in content; only statuses mutate in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::content::{CoverLetterContent, ResumeContent};
use crate::models::response::TokenUsage;

/// Namespace for deriving response ids from request ids (UUIDv5).
const RESPONSE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6b1f_a2c4_9d3e_4f70_8a15_c0de_5eed_f00d);

// ────────────────────────────────────────────────────────────────────────────
// Ids
// ────────────────────────────────────────────────────────────────────────────

/// Mints a new request id: millisecond timestamp plus a random suffix.
/// Ids are never reused; a retry is a brand-new request.
pub fn new_request_id() -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    format!("req_{}_{}", Utc::now().timestamp_millis(), suffix)
}

/// Derives the response id as a pure function of the request id.
///
/// UUIDv5 over a fixed namespace — no substring coupling, no secondary index
/// needed to locate a response given its request.
pub fn response_id_for(request_id: &str) -> String {
    let hash = Uuid::new_v5(&RESPONSE_ID_NAMESPACE, request_id.as_bytes());
    format!("res_{}", hash.simple())
}

// ────────────────────────────────────────────────────────────────────────────
// Stage machine
// ────────────────────────────────────────────────────────────────────────────

/// The fixed four-stage generation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    CreateRequest,
    GenerateContent,
    CreatePdfs,
    UploadStorage,
}

impl Stage {
    /// Canonical execution order.
    pub const ALL: [Stage; 4] = [
        Stage::CreateRequest,
        Stage::GenerateContent,
        Stage::CreatePdfs,
        Stage::UploadStorage,
    ];

    /// Total transition function. `None` only after the final stage.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::CreateRequest => Some(Stage::GenerateContent),
            Stage::GenerateContent => Some(Stage::CreatePdfs),
            Stage::CreatePdfs => Some(Stage::UploadStorage),
            Stage::UploadStorage => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::CreateRequest => "create-request",
            Stage::GenerateContent => "generate-content",
            Stage::CreatePdfs => "create-pdfs",
            Stage::UploadStorage => "upload-storage",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::CreateRequest => "Persist the generation request record",
            Stage::GenerateContent => "Generate document content via the AI engine",
            Stage::CreatePdfs => "Render generated content to PDF",
            Stage::UploadStorage => "Upload rendered artifacts to durable storage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed)
    }
}

/// One entry of the persisted `steps` list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub id: u8,
    pub name: String,
    pub description: String,
    pub status: StepStatus,
}

impl StepRecord {
    fn for_stage(stage: Stage, id: u8) -> Self {
        StepRecord {
            id,
            name: stage.name().to_string(),
            description: stage.description().to_string(),
            status: StepStatus::Pending,
        }
    }
}

/// The full pending step list in canonical order.
pub fn initial_steps() -> Vec<StepRecord> {
    Stage::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| StepRecord::for_stage(*s, i as u8 + 1))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

// ────────────────────────────────────────────────────────────────────────────
// Input snapshot types
// ────────────────────────────────────────────────────────────────────────────

/// Which documents a request produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Resume,
    CoverLetter,
    Both,
}

impl DocumentKind {
    pub fn wants_resume(self) -> bool {
        matches!(self, DocumentKind::Resume | DocumentKind::Both)
    }

    pub fn wants_cover_letter(self) -> bool {
        matches!(self, DocumentKind::CoverLetter | DocumentKind::Both)
    }
}

/// Target job information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubject {
    pub role: String,
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Requester profile snapshot, captured by value at request creation so later
/// profile edits never retroactively alter an in-flight or completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Visual accent color for rendering, e.g. "#2563eb". Required.
    pub accent_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub date_range: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Intermediate results
// ────────────────────────────────────────────────────────────────────────────

/// Partial outputs accumulated as stages complete. A failed run still carries
/// whatever was produced before the failure, so later stages (and operators)
/// can inspect or reuse it without recomputation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntermediateResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_letter: Option<CoverLetterContent>,
    /// Token usage keyed by document label ("resume" / "coverLetter").
    #[serde(default)]
    pub usage_by_document: BTreeMap<String, TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// GenerationRequest
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: String,
    pub kind: DocumentKind,
    pub subject: JobSubject,
    pub profile: Profile,
    pub experience: Vec<ExperienceEntry>,
    pub owner: String,
    pub is_public: bool,
    pub status: RequestStatus,
    pub steps: Vec<StepRecord>,
    pub intermediate_results: IntermediateResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_match_id: Option<String>,
    #[serde(default)]
    pub emphasize: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationRequest {
    /// Sets one stage's step status in place.
    pub fn set_step(&mut self, stage: Stage, status: StepStatus) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.name == stage.name()) {
            step.status = status;
        }
    }

    /// Marks `stage` completed and its successor in progress.
    pub fn complete_stage(&mut self, stage: Stage) {
        self.set_step(stage, StepStatus::Completed);
        if let Some(next) = stage.next() {
            self.set_step(next, StepStatus::InProgress);
        }
    }

    /// Marks the active (first non-terminal) stage failed. Earlier completed
    /// stages are left untouched — there is no rollback.
    pub fn fail_active_stage(&mut self) {
        if let Some(step) = self.steps.iter_mut().find(|s| !s.status.is_terminal()) {
            step.status = StepStatus::Failed;
        }
    }

}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_order_is_total_and_terminates() {
        let mut stage = Stage::CreateRequest;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            seen.push(next);
            stage = next;
        }
        assert_eq!(seen, Stage::ALL.to_vec());
    }

    #[test]
    fn initial_steps_match_canonical_order() {
        let steps = initial_steps();
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].name, "create-request");
        assert_eq!(steps[3].name, "upload-storage");
        assert!(steps.iter().all(|s| s.status == StepStatus::Pending));
        assert_eq!(steps.iter().map(|s| s.id).collect::<Vec<_>>(), [1, 2, 3, 4]);
    }

    #[test]
    fn request_ids_are_unique_and_prefixed() {
        let a = new_request_id();
        let b = new_request_id();
        assert!(a.starts_with("req_"));
        assert_ne!(a, b);
    }

    #[test]
    fn response_id_is_deterministic_and_distinct() {
        let req = "req_1724500000000_ab12cd34";
        assert_eq!(response_id_for(req), response_id_for(req));
        assert!(response_id_for(req).starts_with("res_"));
        assert_ne!(response_id_for(req), response_id_for("req_1724500000000_ab12cd35"));
    }

    #[test]
    fn complete_stage_advances_successor() {
        let mut req = fixture_request();
        req.complete_stage(Stage::CreateRequest);
        assert_eq!(req.steps[0].status, StepStatus::Completed);
        assert_eq!(req.steps[1].status, StepStatus::InProgress);
        assert_eq!(req.steps[2].status, StepStatus::Pending);
    }

    #[test]
    fn fail_active_stage_leaves_completed_prefix() {
        let mut req = fixture_request();
        req.complete_stage(Stage::CreateRequest);
        req.complete_stage(Stage::GenerateContent);
        req.fail_active_stage();
        let statuses: Vec<StepStatus> = req.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            [
                StepStatus::Completed,
                StepStatus::Completed,
                StepStatus::Failed,
                StepStatus::Pending
            ]
        );
    }

    #[test]
    fn kind_toggles_are_independent() {
        assert!(DocumentKind::Both.wants_resume());
        assert!(DocumentKind::Both.wants_cover_letter());
        assert!(DocumentKind::Resume.wants_resume());
        assert!(!DocumentKind::Resume.wants_cover_letter());
        assert!(!DocumentKind::CoverLetter.wants_resume());
    }

    fn fixture_request() -> GenerationRequest {
        GenerationRequest {
            id: new_request_id(),
            kind: DocumentKind::Resume,
            subject: JobSubject {
                role: "Engineer".into(),
                company: "Acme".into(),
                description: None,
            },
            profile: Profile {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                phone: None,
                location: None,
                accent_color: "#2563eb".into(),
                logo_url: None,
                avatar_url: None,
            },
            experience: vec![],
            owner: "user-1".into(),
            is_public: false,
            status: RequestStatus::Pending,
            steps: initial_steps(),
            intermediate_results: IntermediateResults::default(),
            job_match_id: None,
            emphasize: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
