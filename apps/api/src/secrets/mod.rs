//! Secret accessor — fetches provider credentials from a backing source and
//! caches them for a short window so hot paths do not hit the vault per call.
//!
//! The backing source is a trait so tests run against a fixed map and
//! production can point at env vars (or a real vault client later).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

/// How long a fetched secret stays valid in the cache.
pub const SECRET_TTL: Duration = Duration::from_secs(300);

/// A backing store of named secrets. Absence is an error, not an empty value.
#[async_trait]
pub trait SecretSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<String>;
}

/// Reads secrets from process environment variables.
pub struct EnvSecretSource;

#[async_trait]
impl SecretSource for EnvSecretSource {
    async fn fetch(&self, name: &str) -> Result<String> {
        std::env::var(name).map_err(|_| anyhow!("Secret '{name}' is not set"))
    }
}

/// TTL-caching front for a `SecretSource`. Read-mostly; a plain mutex-guarded
/// map is enough since the cache is only contended on expiry.
pub struct Secrets {
    source: Box<dyn SecretSource>,
    cache: Mutex<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl Secrets {
    pub fn new(source: Box<dyn SecretSource>) -> Self {
        Self::with_ttl(source, SECRET_TTL)
    }

    pub fn with_ttl(source: Box<dyn SecretSource>, ttl: Duration) -> Self {
        Secrets {
            source,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the named secret, fetching through the source on a cache miss
    /// or after expiry.
    pub async fn get(&self, name: &str) -> Result<String> {
        {
            let cache = self.cache.lock().expect("secret cache poisoned");
            if let Some((value, fetched_at)) = cache.get(name) {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(value.clone());
                }
            }
        }

        debug!("Secret cache miss for '{name}', fetching from source");
        let value = self.source.fetch(name).await?;

        let mut cache = self.cache.lock().expect("secret cache poisoned");
        cache.insert(name.to_string(), (value.clone(), Instant::now()));
        Ok(value)
    }
}
