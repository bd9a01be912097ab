//! Document Renderer — turns structured content into letter-sized PDFs.
//!
//! HTML is assembled server-side from a named style template, then shipped to
//! a headless Chrome render service which returns the PDF bytes. Rendering is
//! a black box behind `DocumentRenderer`; the orchestrator never sees HTML.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::content::{CoverLetterContent, ResumeContent};
use crate::models::request::Profile;

pub mod templates;

pub use templates::DEFAULT_STYLE;

/// The renderer seam. Production posts to the headless render service; tests
/// substitute a byte-stub.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render_resume(
        &self,
        content: &ResumeContent,
        profile: &Profile,
        style: &str,
    ) -> Result<Bytes, AppError>;

    async fn render_cover_letter(
        &self,
        content: &CoverLetterContent,
        profile: &Profile,
        style: &str,
        date_line: &str,
    ) -> Result<Bytes, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Headless render service client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    html: &'a str,
    options: PdfOptions,
}

/// Letter-sized pages with fixed half-inch margins.
#[derive(Debug, Serialize)]
struct PdfOptions {
    format: &'static str,
    margin: &'static str,
    print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        PdfOptions {
            format: "Letter",
            margin: "0.5in",
            print_background: true,
        }
    }
}

pub struct HtmlRenderClient {
    http: Client,
    endpoint: String,
}

impl HtmlRenderClient {
    pub fn new(endpoint: impl Into<String>) -> anyhow::Result<Self> {
        Ok(HtmlRenderClient {
            http: Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .build()?,
            endpoint: endpoint.into(),
        })
    }

    async fn render_html(&self, html: &str) -> Result<Bytes, AppError> {
        let url = format!("{}/render/pdf", self.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .json(&RenderRequest {
                html,
                options: PdfOptions::default(),
            })
            .send()
            .await
            .map_err(|e| AppError::Render(format!("Render service unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Render(format!(
                "Render service returned {status}: {body}"
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| AppError::Render(format!("Failed to read rendered PDF: {e}")))
    }
}

#[async_trait]
impl DocumentRenderer for HtmlRenderClient {
    async fn render_resume(
        &self,
        content: &ResumeContent,
        profile: &Profile,
        style: &str,
    ) -> Result<Bytes, AppError> {
        let html = build_resume_html(content, profile, style);
        self.render_html(&html).await
    }

    async fn render_cover_letter(
        &self,
        content: &CoverLetterContent,
        profile: &Profile,
        style: &str,
        date_line: &str,
    ) -> Result<Bytes, AppError> {
        let html = build_cover_letter_html(content, profile, style, date_line);
        self.render_html(&html).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTML assembly
// ────────────────────────────────────────────────────────────────────────────

pub fn build_resume_html(content: &ResumeContent, profile: &Profile, style: &str) -> String {
    let template = templates::template_for(style);

    let experience_html: String = content
        .experience
        .iter()
        .map(|entry| {
            let bullets: String = entry
                .bullets
                .iter()
                .map(|b| format!("<li>{}</li>", escape_html(b)))
                .collect();
            let tech = if entry.technologies.is_empty() {
                String::new()
            } else {
                format!(
                    r#"<div class="tech">{}</div>"#,
                    escape_html(&entry.technologies.join(" · "))
                )
            };
            format!(
                r#"<div class="entry"><div class="entry-head"><span>{} — {}</span><span class="entry-dates">{}</span></div><ul>{}</ul>{}</div>"#,
                escape_html(&entry.role),
                escape_html(&entry.company),
                escape_html(&entry.date_range),
                bullets,
                tech
            )
        })
        .collect();

    let skills_html: String = content
        .skills
        .iter()
        .map(|s| format!("<span>{}</span>", escape_html(s)))
        .collect();

    template
        .resume_html
        .replace("{accent}", &escape_html(&profile.accent_color))
        .replace("{avatar_html}", &avatar_html(profile))
        .replace("{name}", &escape_html(&profile.name))
        .replace("{contact_line}", &contact_line(profile))
        .replace("{summary}", &escape_html(&content.summary))
        .replace("{experience_html}", &experience_html)
        .replace("{skills_html}", &skills_html)
}

pub fn build_cover_letter_html(
    content: &CoverLetterContent,
    profile: &Profile,
    style: &str,
    date_line: &str,
) -> String {
    let template = templates::template_for(style);

    let paragraphs_html: String = content
        .paragraphs
        .iter()
        .map(|p| format!(r#"<p class="body">{}</p>"#, escape_html(p)))
        .collect();

    template
        .cover_letter_html
        .replace("{accent}", &escape_html(&profile.accent_color))
        .replace("{logo_html}", &logo_html(profile))
        .replace("{name}", &escape_html(&profile.name))
        .replace("{email}", &escape_html(&profile.email))
        .replace("{date_line}", &escape_html(date_line))
        .replace("{salutation}", &escape_html(&content.salutation))
        .replace("{paragraphs_html}", &paragraphs_html)
        .replace("{closing}", &escape_html(&content.closing))
}

/// Missing avatar degrades to omission, never to failure.
fn avatar_html(profile: &Profile) -> String {
    match &profile.avatar_url {
        Some(url) => format!(r#"<img class="avatar" src="{}">"#, escape_html(url)),
        None => String::new(),
    }
}

fn logo_html(profile: &Profile) -> String {
    match &profile.logo_url {
        Some(url) => format!(r#"<img class="logo" src="{}">"#, escape_html(url)),
        None => String::new(),
    }
}

fn contact_line(profile: &Profile) -> String {
    let mut parts = vec![profile.email.clone()];
    if let Some(phone) = &profile.phone {
        parts.push(phone.clone());
    }
    if let Some(location) = &profile.location {
        parts.push(location.clone());
    }
    escape_html(&parts.join(" · "))
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
