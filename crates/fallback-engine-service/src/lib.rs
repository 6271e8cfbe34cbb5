//! Router assembly, split out of `main.rs` so integration tests can drive
//! the HTTP surface with `tower::ServiceExt::oneshot` instead of binding a
//! real socket, the way the teacher's axum example structures its tests.

pub mod error;
pub mod handlers;
pub mod processors;

use axum::routing::{get, post};
use axum::Router;
use handlers::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/transactions", post(handlers::post_transaction))
        .route("/processors/status", get(handlers::get_processors_status))
        .route("/processors/:name/reset", post(handlers::post_processor_reset))
        .route(
            "/processors/:name/inject-failures",
            post(handlers::post_processor_inject_failures),
        )
        .route("/stats", get(handlers::get_stats))
        .route("/health/live", get(handlers::get_health_live))
        .with_state(state)
}
