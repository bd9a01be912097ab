use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
///
/// Provider credentials (the AI engine API key) are NOT part of Config —
/// they go through the secret accessor, which caches short-term.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL prefixed to object keys when building permanent public URLs.
    /// Usually `{s3_endpoint}/{s3_bucket}` for MinIO, or a CDN domain.
    pub s3_public_base_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Headless Chrome render service base URL (e.g. http://renderer:3001).
    pub render_endpoint: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let s3_endpoint = require_env("S3_ENDPOINT")?;
        let s3_bucket = require_env("S3_BUCKET")?;
        let s3_public_base_url = std::env::var("S3_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("{}/{}", s3_endpoint.trim_end_matches('/'), s3_bucket));

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket,
            s3_endpoint,
            s3_public_base_url,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            render_endpoint: require_env("RENDER_ENDPOINT")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unique var names per test: the process environment is shared across
    // parallel tests.

    #[test]
    fn missing_required_var_names_the_variable() {
        std::env::remove_var("TAILOR_TEST_ABSENT_VAR");
        let err = require_env("TAILOR_TEST_ABSENT_VAR").unwrap_err();
        assert!(err.to_string().contains("TAILOR_TEST_ABSENT_VAR"));
    }

    #[test]
    fn present_var_is_returned() {
        std::env::set_var("TAILOR_TEST_PRESENT_VAR", "value");
        assert_eq!(require_env("TAILOR_TEST_PRESENT_VAR").unwrap(), "value");
    }
}
