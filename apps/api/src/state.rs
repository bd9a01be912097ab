use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::pipeline::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Pool kept for future health/readiness probes; the orchestrator owns
    /// its own store handle built from the same pool.
    #[allow(dead_code)]
    pub db: PgPool,
    #[allow(dead_code)]
    pub config: Config,
    pub orchestrator: Arc<Orchestrator>,
}
