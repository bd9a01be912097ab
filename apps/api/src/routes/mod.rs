pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::pipeline::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Generation pipeline
        .route("/api/v1/generate", post(handlers::handle_generate))
        .route(
            "/api/v1/requests/:id",
            get(handlers::handle_get_request),
        )
        .route(
            "/api/v1/responses/:id",
            get(handlers::handle_get_response),
        )
        .with_state(state)
}
