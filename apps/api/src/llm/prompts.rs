//! Prompt constants for document content generation.
//!
//! The grounding rules here are the business contract, not a suggestion:
//! output may only reorganize and reword facts present in the supplied
//! experience entries. Callers cannot negotiate these away — a custom prompt
//! override is appended after the hard rules, never in place of them.

/// System prompt for resume generation — enforces JSON-only output.
pub const RESUME_SYSTEM: &str = "You are an expert resume writer producing factual, \
    tailored resume content from a candidate's verified work history. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent facts not present in the supplied experience entries.";

/// Resume prompt template.
/// Replace: {profile_json}, {role}, {company}, {jd_text}, {experience_json},
///          {emphasize_json}, {extra_instructions}
pub const RESUME_PROMPT_TEMPLATE: &str = r#"Write resume content tailored to the target role below.

CANDIDATE PROFILE:
{profile_json}

TARGET ROLE: {role} at {company}

JOB DESCRIPTION (may be empty):
{jd_text}

EXPERIENCE ENTRIES (source of truth — ONLY use facts from these):
{experience_json}

SKILLS TO EMPHASIZE where the experience supports them (never force-fit):
{emphasize_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "2-3 sentence professional summary",
  "experience": [
    {
      "company": "exact company name from the entries above",
      "role": "exact role from the entries above",
      "date_range": "exact date range from the entries above",
      "bullets": ["achievement bullet grounded in the entry's highlights"],
      "technologies": ["subset of the entry's technologies"]
    }
  ],
  "skills": ["skill drawn from the entries or the emphasize list above"]
}

HARD RULES:
1. Select the 3-4 MOST RELEVANT experience entries for this role — do NOT include all of them
2. Every company, role, date range, metric, and technology MUST appear in the entries above — no invention, no interpolation
3. Target 600-900 words total
4. Order selected entries by relevance to the target role, most relevant first
{extra_instructions}"#;

/// System prompt for cover letter generation — enforces JSON-only output.
pub const COVER_LETTER_SYSTEM: &str = "You are an expert cover letter writer producing \
    concise, factual letters grounded in a candidate's verified work history. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT invent employers, dates, or metrics.";

/// Cover letter prompt template.
/// Replace: {profile_json}, {role}, {company}, {jd_text}, {experience_json},
///          {extra_instructions}
pub const COVER_LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for the target role below.

CANDIDATE PROFILE:
{profile_json}

TARGET ROLE: {role} at {company}

JOB DESCRIPTION (may be empty):
{jd_text}

EXPERIENCE ENTRIES (source of truth — ONLY use facts from these):
{experience_json}

Return a JSON object with this EXACT schema (no extra fields):
{
  "salutation": "Dear Hiring Manager," (or addressed to the company),
  "paragraphs": ["opening", "body", "closing argument"],
  "closing": "Sincerely," (or similar sign-off, without the candidate name)
}

HARD RULES:
1. Exactly 3 paragraphs, 250-350 words total
2. Reference only facts from the experience entries — no invention
3. Name the company and role naturally in the opening paragraph
4. The strongest 1-2 experience entries carry the body paragraph; skip the rest
{extra_instructions}"#;
