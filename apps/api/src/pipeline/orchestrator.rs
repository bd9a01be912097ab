//! Pipeline Orchestrator — drives a generation request through the fixed
//! four-stage sequence, persisting state after every stage so an external
//! observer polling the request record always sees a prefix of completed
//! stages consistent with actual progress.
//!
//! Flow: create request → generate content → render PDFs → upload → response.
//!
//! Failure semantics: one catch at the top. Steps keep whatever partial state
//! they reached, the request flips to `failed`, and the response records the
//! error with the cost of tokens already consumed — money spent with the AI
//! engine is not refunded by a later rendering or upload failure.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::errors::AppError;
use crate::llm::{cost_usd, ContentGenerator};
use crate::models::request::{
    initial_steps, new_request_id, response_id_for, DocumentKind, ExperienceEntry,
    GenerationRequest, JobSubject, Profile, RequestStatus, Stage,
};
use crate::models::response::{
    ErrorDetail, GeneratedFiles, GenerationResponse, GenerationResult, Metrics, UsageBreakdown,
};
use crate::render::{DocumentRenderer, DEFAULT_STYLE};
use crate::storage::{artifact_filename, ArtifactKind, ArtifactStore};
use crate::store::GenerationStore;

/// Usage-map keys, fixed for the life of the record format.
const RESUME_DOC: &str = "resume";
const COVER_LETTER_DOC: &str = "coverLetter";

// ────────────────────────────────────────────────────────────────────────────
// Inputs / outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub kind: DocumentKind,
    pub subject: JobSubject,
    pub profile: Profile,
    pub experience: Vec<ExperienceEntry>,
    pub owner: String,
    pub job_match_id: Option<String>,
    pub emphasize: Vec<String>,
    pub style: Option<String>,
    pub prompt_override: Option<String>,
}

/// Outcome of one `generate` call. A pipeline failure still yields an outcome
/// (the request and failure response exist and are inspectable); only
/// precondition and unrecoverable persistence errors surface as `Err`.
#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub request_id: String,
    pub response_id: String,
    pub resume_url: Option<String>,
    pub cover_letter_url: Option<String>,
    pub error: Option<ErrorDetail>,
}

/// What the happy path hands back to finalization.
struct StageOutput {
    files: GeneratedFiles,
    resume_url: Option<String>,
    cover_letter_url: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    store: Arc<dyn GenerationStore>,
    generator: Arc<dyn ContentGenerator>,
    renderer: Arc<dyn DocumentRenderer>,
    artifacts: Arc<dyn ArtifactStore>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn GenerationStore>,
        generator: Arc<dyn ContentGenerator>,
        renderer: Arc<dyn DocumentRenderer>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Orchestrator {
            store,
            generator,
            renderer,
            artifacts,
        }
    }

    /// The sole pipeline entry point.
    pub async fn generate(&self, options: GenerateOptions) -> Result<GenerateOutcome, AppError> {
        validate(&options)?;
        let started = Instant::now();

        // Stage 1: persist the request. If this fails there is no request id
        // to attach anything to, so the error propagates uncreated.
        let mut request = build_request(&options);
        self.store.create_request(&request).await?;
        info!("Created generation request {}", request.id);

        // Record creation succeeded by definition: stage 1 completes
        // immediately and stage 2 opens.
        request.status = RequestStatus::Processing;
        request.complete_stage(Stage::CreateRequest);
        self.persist(&mut request).await?;

        match self.run_stages(&mut request, &options).await {
            Ok(output) => self.finalize_success(&request, output, started).await,
            Err(cause) => self.finalize_failure(&mut request, cause, started).await,
        }
    }

    /// Read-only status/progress poll.
    pub async fn get_request(&self, id: &str) -> Result<Option<GenerationRequest>, AppError> {
        self.store.get_request(id).await
    }

    /// Read-only outcome lookup. Ownership checks are the caller's job
    /// (cross-check against the backing request's `owner`).
    pub async fn get_response(&self, id: &str) -> Result<Option<GenerationResponse>, AppError> {
        self.store.get_response(id).await
    }

    // ── Stages 2–4 ──────────────────────────────────────────────────────────

    async fn run_stages(
        &self,
        request: &mut GenerationRequest,
        options: &GenerateOptions,
    ) -> Result<StageOutput, AppError> {
        let style = options.style.as_deref().unwrap_or(DEFAULT_STYLE);

        // Stage 2: AI content generation. Each successful call is persisted
        // immediately so a crash before rendering still leaves usable state.
        if request.kind.wants_resume() {
            info!("Generating resume content for {}", request.id);
            let doc = self
                .generator
                .resume(
                    &options.profile,
                    &options.subject,
                    &options.experience,
                    &options.emphasize,
                    options.prompt_override.as_deref(),
                )
                .await?;
            request.intermediate_results.resume = Some(doc.content);
            request
                .intermediate_results
                .usage_by_document
                .insert(RESUME_DOC.to_string(), doc.usage);
            request.intermediate_results.model = Some(doc.model);
            self.persist(request).await?;
        }

        if request.kind.wants_cover_letter() {
            info!("Generating cover letter content for {}", request.id);
            let doc = self
                .generator
                .cover_letter(
                    &options.profile,
                    &options.subject,
                    &options.experience,
                    options.prompt_override.as_deref(),
                )
                .await?;
            request.intermediate_results.cover_letter = Some(doc.content);
            request
                .intermediate_results
                .usage_by_document
                .insert(COVER_LETTER_DOC.to_string(), doc.usage);
            request.intermediate_results.model = Some(doc.model);
            self.persist(request).await?;
        }

        request.complete_stage(Stage::GenerateContent);
        self.persist(request).await?;

        // Stage 3: render PDFs.
        let resume_pdf = match &request.intermediate_results.resume {
            Some(content) => {
                info!("Rendering resume PDF for {}", request.id);
                Some(
                    self.renderer
                        .render_resume(content, &options.profile, style)
                        .await?,
                )
            }
            None => None,
        };

        let cover_letter_pdf = match &request.intermediate_results.cover_letter {
            Some(content) => {
                info!("Rendering cover letter PDF for {}", request.id);
                let date_line = Utc::now().format("%B %-d, %Y").to_string();
                Some(
                    self.renderer
                        .render_cover_letter(content, &options.profile, style, &date_line)
                        .await?,
                )
            }
            None => None,
        };

        request.complete_stage(Stage::CreatePdfs);
        self.persist(request).await?;

        // Stage 4: upload artifacts.
        let mut files = GeneratedFiles::default();
        let mut resume_url = None;
        let mut cover_letter_url = None;

        if let Some(pdf) = resume_pdf {
            let filename = artifact_filename(
                &options.profile.name,
                &options.subject.company,
                ArtifactKind::Resume,
                &request.id,
            );
            let stored = self
                .artifacts
                .upload(pdf, &filename, ArtifactKind::Resume)
                .await?;
            resume_url = Some(stored.public_url);
            files.resume = Some(stored.artifact);
        }

        if let Some(pdf) = cover_letter_pdf {
            let filename = artifact_filename(
                &options.profile.name,
                &options.subject.company,
                ArtifactKind::CoverLetter,
                &request.id,
            );
            let stored = self
                .artifacts
                .upload(pdf, &filename, ArtifactKind::CoverLetter)
                .await?;
            cover_letter_url = Some(stored.public_url);
            files.cover_letter = Some(stored.artifact);
        }

        request.complete_stage(Stage::UploadStorage);
        request.status = RequestStatus::Completed;
        self.persist(request).await?;

        Ok(StageOutput {
            files,
            resume_url,
            cover_letter_url,
        })
    }

    // ── Finalization ────────────────────────────────────────────────────────

    async fn finalize_success(
        &self,
        request: &GenerationRequest,
        output: StageOutput,
        started: Instant,
    ) -> Result<GenerateOutcome, AppError> {
        let response = GenerationResponse {
            id: response_id_for(&request.id),
            request_id: request.id.clone(),
            result: GenerationResult::succeeded(
                request.intermediate_results.resume.clone(),
                request.intermediate_results.cover_letter.clone(),
            ),
            metrics: self.metrics_for(request, started),
            files: Some(output.files),
            created_at: Utc::now(),
        };
        self.store.create_response(&response).await?;

        info!(
            "Generation {} completed in {}ms (cost ${:.6})",
            request.id, response.metrics.duration_ms, response.metrics.cost_usd
        );

        Ok(GenerateOutcome {
            request_id: request.id.clone(),
            response_id: response.id,
            resume_url: output.resume_url,
            cover_letter_url: output.cover_letter_url,
            error: None,
        })
    }

    async fn finalize_failure(
        &self,
        request: &mut GenerationRequest,
        cause: AppError,
        started: Instant,
    ) -> Result<GenerateOutcome, AppError> {
        error!("Generation {} failed: {cause}", request.id);

        // No rollback: steps keep the partial state they reached. If even
        // that state cannot be recorded, the run aborts before any response
        // is written — a response must never contradict its request record.
        request.status = RequestStatus::Failed;
        request.fail_active_stage();
        self.persist(request).await.map_err(|persist_err| {
            error!(
                "Could not persist failed state for {} (original error: {cause}): {persist_err}",
                request.id
            );
            persist_err
        })?;

        let detail = ErrorDetail {
            message: cause.to_string(),
            code: cause.code().to_string(),
        };
        let response = GenerationResponse {
            id: response_id_for(&request.id),
            request_id: request.id.clone(),
            result: GenerationResult::failed(detail.message.clone(), detail.code.clone()),
            // Cost reflects only completed token-consuming calls: tokens
            // already spent are billed even when a later stage failed.
            metrics: self.metrics_for(request, started),
            files: None,
            created_at: Utc::now(),
        };

        // Writing the failure response is itself fallible. When it fails the
        // caller gets the persistence error and must treat the run as
        // "status unknown, inspect the request record directly".
        self.store.create_response(&response).await.map_err(|e| {
            error!(
                "Could not persist failure response for {} (original error: {}): {e}",
                request.id, detail.message
            );
            e
        })?;

        Ok(GenerateOutcome {
            request_id: request.id.clone(),
            response_id: response.id,
            resume_url: None,
            cover_letter_url: None,
            error: Some(detail),
        })
    }

    fn metrics_for(&self, request: &GenerationRequest, started: Instant) -> Metrics {
        let breakdown =
            UsageBreakdown::from_map(request.intermediate_results.usage_by_document.clone());
        let model = request.intermediate_results.model.clone();
        let cost = cost_usd(
            &breakdown.total,
            model.as_deref().unwrap_or(crate::llm::MODEL),
        );
        Metrics {
            duration_ms: started.elapsed().as_millis() as u64,
            token_usage: breakdown,
            cost_usd: cost,
            model,
        }
    }

    /// Write-then-proceed: stage N's state is visible before stage N+1 runs.
    async fn persist(&self, request: &mut GenerationRequest) -> Result<(), AppError> {
        request.updated_at = Utc::now();
        self.store.update_request(request).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Construction and preconditions
// ────────────────────────────────────────────────────────────────────────────

fn build_request(options: &GenerateOptions) -> GenerationRequest {
    let now = Utc::now();
    GenerationRequest {
        id: new_request_id(),
        kind: options.kind,
        subject: options.subject.clone(),
        profile: options.profile.clone(),
        experience: options.experience.clone(),
        owner: options.owner.clone(),
        is_public: false,
        status: RequestStatus::Pending,
        steps: initial_steps(),
        intermediate_results: Default::default(),
        job_match_id: options.job_match_id.clone(),
        emphasize: options.emphasize.clone(),
        created_at: now,
        updated_at: now,
    }
}

/// Precondition errors reject before any record is created.
fn validate(options: &GenerateOptions) -> Result<(), AppError> {
    if options.subject.role.trim().is_empty() {
        return Err(AppError::Validation("subject.role is required".to_string()));
    }
    if options.subject.company.trim().is_empty() {
        return Err(AppError::Validation(
            "subject.company is required".to_string(),
        ));
    }
    if options.profile.name.trim().is_empty() {
        return Err(AppError::Validation("profile.name is required".to_string()));
    }
    // The accent is a precondition, not a default: a profile without one was
    // never completed upstream.
    if options.profile.accent_color.trim().is_empty() {
        return Err(AppError::Validation(
            "profile.accent_color is required".to_string(),
        ));
    }
    if options.owner.trim().is_empty() {
        return Err(AppError::Validation("owner is required".to_string()));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    use crate::llm::GeneratedDocument;
    use crate::models::content::{CoverLetterContent, ResumeContent, SelectedExperience};
    use crate::models::request::StepStatus;
    use crate::models::response::{ArtifactRef, TokenUsage};
    use crate::storage::StoredArtifact;
    use crate::store::memory::MemoryStore;

    // ── Mock adapters ───────────────────────────────────────────────────────

    #[derive(Default)]
    struct MockGenerator {
        fail_resume: bool,
        fail_cover_letter: bool,
    }

    #[async_trait]
    impl ContentGenerator for MockGenerator {
        async fn resume(
            &self,
            _profile: &Profile,
            _subject: &JobSubject,
            experience: &[ExperienceEntry],
            _emphasize: &[String],
            _prompt_override: Option<&str>,
        ) -> Result<GeneratedDocument<ResumeContent>, AppError> {
            if self.fail_resume {
                return Err(AppError::AiGeneration("resume call failed".to_string()));
            }
            let selected = experience
                .iter()
                .take(3)
                .map(|e| SelectedExperience {
                    company: e.company.clone(),
                    role: e.role.clone(),
                    date_range: e.date_range.clone(),
                    bullets: e.highlights.clone(),
                    technologies: e.technologies.clone(),
                })
                .collect();
            Ok(GeneratedDocument {
                content: ResumeContent {
                    summary: "Summary".to_string(),
                    experience: selected,
                    skills: vec!["Rust".to_string()],
                },
                // Prompt tokens scale with supplied experience, so cost
                // monotonicity is observable through the mock.
                usage: TokenUsage::new(200 * experience.len() as u32 + 100, 300),
                model: "claude-sonnet-4-5".to_string(),
            })
        }

        async fn cover_letter(
            &self,
            _profile: &Profile,
            _subject: &JobSubject,
            experience: &[ExperienceEntry],
            _prompt_override: Option<&str>,
        ) -> Result<GeneratedDocument<CoverLetterContent>, AppError> {
            if self.fail_cover_letter {
                return Err(AppError::AiGeneration(
                    "cover letter call failed".to_string(),
                ));
            }
            Ok(GeneratedDocument {
                content: CoverLetterContent {
                    salutation: "Dear Hiring Manager,".to_string(),
                    paragraphs: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                    closing: "Sincerely,".to_string(),
                },
                usage: TokenUsage::new(150 * experience.len() as u32 + 80, 200),
                model: "claude-sonnet-4-5".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct MockRenderer {
        fail: bool,
    }

    #[async_trait]
    impl DocumentRenderer for MockRenderer {
        async fn render_resume(
            &self,
            _content: &ResumeContent,
            _profile: &Profile,
            _style: &str,
        ) -> Result<Bytes, AppError> {
            if self.fail {
                return Err(AppError::Render("renderer exploded".to_string()));
            }
            Ok(Bytes::from_static(b"%PDF-1.4 resume"))
        }

        async fn render_cover_letter(
            &self,
            _content: &CoverLetterContent,
            _profile: &Profile,
            _style: &str,
            _date_line: &str,
        ) -> Result<Bytes, AppError> {
            if self.fail {
                return Err(AppError::Render("renderer exploded".to_string()));
            }
            Ok(Bytes::from_static(b"%PDF-1.4 letter"))
        }
    }

    #[derive(Default)]
    struct MockArtifacts {
        fail: bool,
        uploads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArtifactStore for MockArtifacts {
        async fn upload(
            &self,
            bytes: Bytes,
            filename: &str,
            kind: ArtifactKind,
        ) -> Result<StoredArtifact, AppError> {
            if self.fail {
                return Err(AppError::Storage("bucket unavailable".to_string()));
            }
            let key = format!("{}/2026-08-24/{}", kind.prefix(), filename);
            self.uploads.lock().unwrap().push(key.clone());
            Ok(StoredArtifact {
                artifact: ArtifactRef {
                    path: key.clone(),
                    size_bytes: bytes.len() as u64,
                    storage_class: "STANDARD".to_string(),
                },
                public_url: format!("https://cdn.example.com/{key}"),
            })
        }
    }

    // ── Harness ─────────────────────────────────────────────────────────────

    struct Harness {
        store: Arc<MemoryStore>,
        artifacts: Arc<MockArtifacts>,
        orchestrator: Orchestrator,
    }

    fn harness(
        generator: MockGenerator,
        renderer: MockRenderer,
        artifacts: MockArtifacts,
    ) -> Harness {
        let store = Arc::new(MemoryStore::default());
        let artifacts = Arc::new(artifacts);
        let orchestrator = Orchestrator::new(
            store.clone(),
            Arc::new(generator),
            Arc::new(renderer),
            artifacts.clone(),
        );
        Harness {
            store,
            artifacts,
            orchestrator,
        }
    }

    fn experience_fixture(n: usize) -> Vec<ExperienceEntry> {
        (0..n)
            .map(|i| ExperienceEntry {
                company: format!("Company {i}"),
                role: "Engineer".to_string(),
                date_range: "2020 – 2024".to_string(),
                highlights: vec![format!("Did thing {i}")],
                technologies: vec!["Rust".to_string()],
            })
            .collect()
    }

    fn options(kind: DocumentKind) -> GenerateOptions {
        GenerateOptions {
            kind,
            subject: JobSubject {
                role: "Staff Engineer".to_string(),
                company: "Acme".to_string(),
                description: Some("Storage systems".to_string()),
            },
            profile: Profile {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
                location: None,
                accent_color: "#2563eb".to_string(),
                logo_url: None,
                avatar_url: None,
            },
            experience: experience_fixture(4),
            owner: "user-1".to_string(),
            job_match_id: None,
            emphasize: vec!["Rust".to_string()],
            style: None,
            prompt_override: None,
        }
    }

    fn step_statuses(req: &GenerationRequest) -> Vec<StepStatus> {
        req.steps.iter().map(|s| s.status).collect()
    }

    /// Steps must be a completed prefix, optionally followed by exactly one
    /// failed step, then pending — never completed after failed, never two
    /// in-progress.
    fn assert_step_invariant(req: &GenerationRequest) {
        let statuses = step_statuses(req);
        let mut seen_non_completed = false;
        let mut failed_count = 0;
        for s in &statuses {
            match s {
                StepStatus::Completed => assert!(!seen_non_completed, "completed after gap"),
                StepStatus::Failed => {
                    failed_count += 1;
                    seen_non_completed = true;
                }
                _ => seen_non_completed = true,
            }
        }
        assert!(failed_count <= 1, "more than one failed step");
        let in_progress = statuses
            .iter()
            .filter(|s| **s == StepStatus::InProgress)
            .count();
        assert!(in_progress <= 1, "two steps in progress");
    }

    // ── Success paths ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn both_kind_produces_both_documents_and_files() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let outcome = h.orchestrator.generate(options(DocumentKind::Both)).await.unwrap();

        assert!(outcome.error.is_none());
        assert!(outcome.resume_url.is_some());
        assert!(outcome.cover_letter_url.is_some());

        let response = h
            .orchestrator
            .get_response(&outcome.response_id)
            .await
            .unwrap()
            .expect("response persisted");
        assert!(response.result.success);
        assert!(response.result.resume.is_some());
        assert!(response.result.cover_letter.is_some());
        let files = response.files.unwrap();
        assert!(files.resume.is_some());
        assert!(files.cover_letter.is_some());
        assert_eq!(response.metrics.token_usage.by_document.len(), 2);
        assert!(response.metrics.cost_usd > 0.0);

        let request = h
            .orchestrator
            .get_request(&outcome.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Completed);
        assert!(request
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Completed));
        assert_step_invariant(&request);
    }

    #[tokio::test]
    async fn resume_only_omits_cover_letter_file() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap();

        assert!(outcome.cover_letter_url.is_none());
        let response = h
            .orchestrator
            .get_response(&outcome.response_id)
            .await
            .unwrap()
            .unwrap();
        assert!(response.result.resume.is_some());
        assert!(response.result.cover_letter.is_none());
        assert!(response.files.unwrap().cover_letter.is_none());
        assert_eq!(h.artifacts.uploads.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn response_id_is_pure_function_of_request_id() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap();
        assert_eq!(outcome.response_id, response_id_for(&outcome.request_id));
        assert!(h
            .orchestrator
            .get_response(&response_id_for(&outcome.request_id))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn cost_is_monotonic_in_experience_count() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let mut small = options(DocumentKind::Resume);
        small.experience = experience_fixture(2);
        let mut large = options(DocumentKind::Resume);
        large.experience = experience_fixture(4);

        let small_outcome = h.orchestrator.generate(small).await.unwrap();
        let large_outcome = h.orchestrator.generate(large).await.unwrap();

        let small_cost = h
            .orchestrator
            .get_response(&small_outcome.response_id)
            .await
            .unwrap()
            .unwrap()
            .metrics
            .cost_usd;
        let large_cost = h
            .orchestrator
            .get_response(&large_outcome.response_id)
            .await
            .unwrap()
            .unwrap()
            .metrics
            .cost_usd;
        assert!(large_cost >= small_cost);
    }

    #[tokio::test]
    async fn rendered_content_never_leaves_supplied_experience() {
        let renderer = MockRenderer::default();
        let h = harness(MockGenerator::default(), renderer, MockArtifacts::default());
        let opts = options(DocumentKind::Resume);
        let supplied: Vec<String> = opts.experience.iter().map(|e| e.company.clone()).collect();

        h.orchestrator.generate(opts).await.unwrap();

        // The renderer is downstream of generation: everything it saw must
        // trace back to the supplied experience list.
        let request = h.store.requests.lock().unwrap().values().next().cloned().unwrap();
        let resume = request.intermediate_results.resume.unwrap();
        for entry in &resume.experience {
            assert!(
                supplied.contains(&entry.company),
                "fabricated employer {}",
                entry.company
            );
        }
    }

    // ── Failure paths ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn ai_failure_leaves_failed_request_and_zero_uploads() {
        let h = harness(
            MockGenerator {
                fail_resume: true,
                ..Default::default()
            },
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap();

        let error = outcome.error.expect("failure surfaces in outcome");
        assert_eq!(error.code, "AI_GENERATION_FAILED");
        assert!(outcome.resume_url.is_none());
        assert!(h.artifacts.uploads.lock().unwrap().is_empty());

        let request = h
            .orchestrator
            .get_request(&outcome.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Failed);
        assert_step_invariant(&request);
        assert_eq!(request.steps[1].status, StepStatus::Failed);

        let response = h
            .orchestrator
            .get_response(&outcome.response_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!response.result.success);
        assert!(response.files.is_none());
        // No tokens were consumed before the failure.
        assert_eq!(response.metrics.cost_usd, 0.0);
    }

    #[tokio::test]
    async fn partial_ai_success_still_bills_consumed_tokens() {
        // Resume call succeeds, cover letter call fails: the resume tokens
        // were spent and stay on the bill.
        let h = harness(
            MockGenerator {
                fail_cover_letter: true,
                ..Default::default()
            },
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Both))
            .await
            .unwrap();

        let response = h
            .orchestrator
            .get_response(&outcome.response_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!response.result.success);
        assert!(response.metrics.cost_usd > 0.0);
        assert_eq!(response.metrics.token_usage.by_document.len(), 1);
        assert!(response
            .metrics
            .token_usage
            .by_document
            .contains_key("resume"));
    }

    #[tokio::test]
    async fn upload_failure_keeps_inspectable_content_but_no_files() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts {
                fail: true,
                ..Default::default()
            },
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap();

        assert_eq!(outcome.error.unwrap().code, "STORAGE_FAILED");

        let request = h
            .orchestrator
            .get_request(&outcome.request_id)
            .await
            .unwrap()
            .unwrap();
        assert!(request.intermediate_results.resume.is_some());
        assert_step_invariant(&request);
        assert_eq!(request.steps[3].status, StepStatus::Failed);

        let response = h
            .orchestrator
            .get_response(&outcome.response_id)
            .await
            .unwrap()
            .unwrap();
        assert!(response.files.is_none());
        // AI tokens were spent before the upload broke.
        assert!(response.metrics.cost_usd > 0.0);
    }

    #[tokio::test]
    async fn render_failure_maps_to_render_code() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer {
                fail: true,
                ..Default::default()
            },
            MockArtifacts::default(),
        );
        let outcome = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap();
        assert_eq!(outcome.error.unwrap().code, "RENDER_FAILED");
        assert!(h.artifacts.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn precondition_failure_creates_no_records() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let mut opts = options(DocumentKind::Resume);
        opts.subject.company = "   ".to_string();

        let err = h.orchestrator.generate(opts).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(h.store.requests.lock().unwrap().is_empty());
        assert!(h.store.responses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_accent_is_a_precondition_error() {
        let h = harness(
            MockGenerator::default(),
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        let mut opts = options(DocumentKind::Resume);
        opts.profile.accent_color = String::new();
        assert!(h.orchestrator.generate(opts).await.is_err());
        assert!(h.store.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_failure_response_write_propagates_with_no_response() {
        let h = harness(
            MockGenerator {
                fail_resume: true,
                ..Default::default()
            },
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        *h.store.fail_response_writes.lock().unwrap() = true;

        let err = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        // Status unknown: the request exists but no response was written.
        assert_eq!(h.store.requests.lock().unwrap().len(), 1);
        assert!(h.store.responses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_state_persist_failure_aborts_without_response() {
        let h = harness(
            MockGenerator {
                fail_resume: true,
                ..Default::default()
            },
            MockRenderer::default(),
            MockArtifacts::default(),
        );
        // First update (processing + stage 1 complete) succeeds; the
        // failed-state write in the failure handler is the second.
        *h.store.fail_updates_after.lock().unwrap() = Some(1);

        let err = h
            .orchestrator
            .generate(options(DocumentKind::Resume))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INTERNAL_ERROR");
        // No response may contradict an unrecorded request state.
        assert!(h.store.responses.lock().unwrap().is_empty());
        // The record keeps the last successfully persisted state.
        let request = h
            .store
            .requests
            .lock()
            .unwrap()
            .values()
            .next()
            .cloned()
            .unwrap();
        assert_eq!(request.status, RequestStatus::Processing);
    }
}
