//! Named HTML style templates for document rendering.
//!
//! Resolution is by style name; the registry is built once and cached for the
//! process lifetime. Placeholders are filled with `.replace` by the builders
//! in the parent module, which escape all user-supplied text first.

use std::collections::HashMap;
use std::sync::OnceLock;

pub struct StyleTemplate {
    pub resume_html: &'static str,
    pub cover_letter_html: &'static str,
}

static REGISTRY: OnceLock<HashMap<&'static str, StyleTemplate>> = OnceLock::new();

/// Looks up a style by name. Unknown styles fall back to "modern" rather than
/// failing a run over a cosmetic choice.
pub fn template_for(style: &str) -> &'static StyleTemplate {
    let registry = REGISTRY.get_or_init(build_registry);
    registry
        .get(style)
        .unwrap_or_else(|| registry.get(DEFAULT_STYLE).expect("default style registered"))
}

pub const DEFAULT_STYLE: &str = "modern";

fn build_registry() -> HashMap<&'static str, StyleTemplate> {
    let mut map = HashMap::new();
    map.insert(
        "modern",
        StyleTemplate {
            resume_html: MODERN_RESUME,
            cover_letter_html: MODERN_COVER_LETTER,
        },
    );
    map
}

const MODERN_RESUME: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  @page { size: letter; margin: 0.5in; }
  body { font-family: 'Helvetica Neue', Arial, sans-serif; font-size: 10.5pt; color: #1f2937; margin: 0; }
  header { border-bottom: 3px solid {accent}; padding-bottom: 8px; margin-bottom: 14px; display: flex; align-items: center; gap: 12px; }
  h1 { font-size: 20pt; margin: 0; color: {accent}; }
  .contact { font-size: 9pt; color: #6b7280; margin-top: 2px; }
  h2 { font-size: 12pt; color: {accent}; border-bottom: 1px solid #e5e7eb; padding-bottom: 2px; margin: 14px 0 6px; }
  .entry { margin-bottom: 10px; }
  .entry-head { display: flex; justify-content: space-between; font-weight: 600; }
  .entry-dates { color: #6b7280; font-weight: 400; font-size: 9pt; }
  ul { margin: 4px 0 0 18px; padding: 0; }
  li { margin-bottom: 2px; }
  .tech { font-size: 8.5pt; color: #6b7280; margin-top: 2px; }
  .skills span { display: inline-block; background: #f3f4f6; border-radius: 3px; padding: 1px 6px; margin: 0 4px 4px 0; font-size: 9pt; }
  .avatar { width: 56px; height: 56px; border-radius: 50%; object-fit: cover; }
</style>
</head>
<body>
<header>
  {avatar_html}
  <div>
    <h1>{name}</h1>
    <div class="contact">{contact_line}</div>
  </div>
</header>
<h2>Summary</h2>
<p>{summary}</p>
<h2>Experience</h2>
{experience_html}
<h2>Skills</h2>
<div class="skills">{skills_html}</div>
</body>
</html>"#;

const MODERN_COVER_LETTER: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
  @page { size: letter; margin: 0.5in; }
  body { font-family: 'Helvetica Neue', Arial, sans-serif; font-size: 11pt; color: #1f2937; line-height: 1.5; margin: 0; }
  header { border-bottom: 3px solid {accent}; padding-bottom: 8px; margin-bottom: 18px; }
  .name { font-size: 16pt; font-weight: 600; color: {accent}; }
  .contact { font-size: 9pt; color: #6b7280; }
  .date { margin-bottom: 16px; color: #6b7280; }
  .salutation { margin-bottom: 12px; }
  p.body { margin: 0 0 12px; text-align: justify; }
  .closing { margin-top: 18px; }
  .logo { height: 32px; float: right; }
</style>
</head>
<body>
<header>
  {logo_html}
  <div class="name">{name}</div>
  <div class="contact">{email}</div>
</header>
<div class="date">{date_line}</div>
<div class="salutation">{salutation}</div>
{paragraphs_html}
<div class="closing">{closing}<br>{name}</div>
</body>
</html>"#;
