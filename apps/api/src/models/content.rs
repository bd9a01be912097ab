//! Structured document content — the two fixed schemas the AI engine must
//! return. Serde rejects responses that drift from these shapes.

use serde::{Deserialize, Serialize};

/// One experience entry selected and reworded for the target role.
/// Facts must come from the supplied experience list; the generator is not
/// allowed to invent employers, dates, or metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedExperience {
    pub company: String,
    pub role: String,
    pub date_range: String,
    pub bullets: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
}

/// Resume content schema. Target 600–900 words; 3–4 selected entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeContent {
    pub summary: String,
    pub experience: Vec<SelectedExperience>,
    pub skills: Vec<String>,
}

/// Cover letter content schema. Target 250–350 words across 3 paragraphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverLetterContent {
    pub salutation: String,
    pub paragraphs: Vec<String>,
    pub closing: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resume_content_round_trips() {
        let json = serde_json::json!({
            "summary": "Systems engineer with a decade of storage work.",
            "experience": [{
                "company": "Acme",
                "role": "Staff Engineer",
                "date_range": "2019 – 2024",
                "bullets": ["Led the cache rewrite"],
                "technologies": ["Rust"]
            }],
            "skills": ["Rust", "Postgres"]
        });
        let content: ResumeContent = serde_json::from_value(json).unwrap();
        assert_eq!(content.experience.len(), 1);
        assert_eq!(content.experience[0].company, "Acme");
    }

    #[test]
    fn cover_letter_missing_closing_is_rejected() {
        let json = serde_json::json!({
            "salutation": "Dear Hiring Manager,",
            "paragraphs": ["p1", "p2", "p3"]
        });
        assert!(serde_json::from_value::<CoverLetterContent>(json).is_err());
    }
}
