mod config;
mod db;
mod errors;
mod llm;
mod models;
mod pipeline;
mod render;
mod routes;
mod secrets;
mod state;
mod storage;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm::{CompletionClient, LlmContentGenerator};
use crate::pipeline::orchestrator::Orchestrator;
use crate::render::HtmlRenderClient;
use crate::routes::build_router;
use crate::secrets::{EnvSecretSource, Secrets};
use crate::state::AppState;
use crate::storage::S3ArtifactStore;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("tailor_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Secret accessor (env-backed source, short TTL cache)
    let secrets = Arc::new(Secrets::new(Box::new(EnvSecretSource)));

    // AI content generator
    let generator = LlmContentGenerator::new(CompletionClient::new(secrets)?);
    info!("Content generator initialized (model: {})", llm::MODEL);

    // Headless render service client
    let renderer = HtmlRenderClient::new(config.render_endpoint.clone())?;
    info!("Render client initialized ({})", config.render_endpoint);

    // Artifact store
    let artifacts = S3ArtifactStore::new(
        s3,
        config.s3_bucket.clone(),
        config.s3_public_base_url.clone(),
    );

    // Pipeline orchestrator over the adapter seams
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(PgStore::new(db.clone())),
        Arc::new(generator),
        Arc::new(renderer),
        Arc::new(artifacts),
    ));

    let state = AppState {
        db,
        config: config.clone(),
        orchestrator,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "tailor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
