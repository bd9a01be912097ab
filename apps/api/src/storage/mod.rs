//! Artifact Store — uploads rendered PDFs to S3-compatible storage and
//! returns a stable public reference.
//!
//! Objects are date- and type-partitioned (`resumes/yyyy-mm-dd/...`,
//! `cover-letters/yyyy-mm-dd/...`), marked publicly readable with a long
//! cache lifetime. The returned URL is permanent: no expiry, no signed-URL
//! rotation.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use crate::errors::AppError;
use crate::models::response::ArtifactRef;

const CACHE_CONTROL: &str = "public, max-age=31536000";
const STORAGE_CLASS: &str = "STANDARD";

/// Which document an artifact holds; determines the key prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Resume,
    CoverLetter,
}

impl ArtifactKind {
    pub fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::Resume => "resumes",
            ArtifactKind::CoverLetter => "cover-letters",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKind::Resume => "resume",
            ArtifactKind::CoverLetter => "cover-letter",
        }
    }
}

/// One stored artifact: its record metadata plus the permanent public URL.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub artifact: ArtifactRef,
    pub public_url: String,
}

/// The storage seam. Production uploads to S3; tests capture buffers in a map.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        kind: ArtifactKind,
    ) -> Result<StoredArtifact, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Key derivation
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic, collision-resistant object filename:
/// slug(name)-slug(company)-<type>-<request suffix>.pdf
pub fn artifact_filename(
    profile_name: &str,
    company: &str,
    kind: ArtifactKind,
    request_id: &str,
) -> String {
    let suffix = request_id.rsplit('_').next().unwrap_or("0");
    format!(
        "{}-{}-{}-{}.pdf",
        slug(profile_name),
        slug(company),
        kind.label(),
        suffix
    )
}

/// Date-partitioned object key under the kind's prefix.
pub fn object_key(kind: ArtifactKind, filename: &str) -> String {
    format!(
        "{}/{}/{}",
        kind.prefix(),
        Utc::now().format("%Y-%m-%d"),
        filename
    )
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// S3 implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct S3ArtifactStore {
    client: S3Client,
    bucket: String,
    public_base_url: String,
}

impl S3ArtifactStore {
    pub fn new(
        client: S3Client,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        S3ArtifactStore {
            client,
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn upload(
        &self,
        bytes: Bytes,
        filename: &str,
        kind: ArtifactKind,
    ) -> Result<StoredArtifact, AppError> {
        let key = object_key(kind, filename);
        let size_bytes = bytes.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type("application/pdf")
            .cache_control(CACHE_CONTROL)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload of '{key}' failed: {e}")))?;

        let public_url = format!("{}/{}", self.public_base_url.trim_end_matches('/'), key);
        info!("Uploaded artifact {key} ({size_bytes} bytes)");

        Ok(StoredArtifact {
            artifact: ArtifactRef {
                path: key,
                size_bytes,
                storage_class: STORAGE_CLASS.to_string(),
            },
            public_url,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
