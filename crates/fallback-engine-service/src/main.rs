//! Process entry point: loads configuration, builds the processor fleet
//! and engine, and serves the HTTP surface of §6.1.
//!
//! Grounded on the teacher's `axum-resilient-kv-store` example binary:
//! `tracing_subscriber::fmt().with_env_filter(...).init()` up front, an
//! `axum::Router` built from a small set of routes plus `with_state`, and
//! `axum::serve` against a `TcpListener`.

use fallback_engine_core::{EngineConfig, FallbackEngine, Processor};
use fallback_engine_service::handlers::AppState;
use fallback_engine_service::{build_router, processors};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = EngineConfig::from_env();
    let fleet: Vec<Arc<dyn Processor>> = vec![
        Arc::new(processors::VortexPay),
        Arc::new(processors::SwiftPay),
        Arc::new(processors::PixFlow),
    ];
    let engine = Arc::new(FallbackEngine::new(fleet, config));
    let state = AppState { engine };
    let app = build_router(state);

    let addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));
    tracing::info!(%addr, "fallback-engine-service listening");
    axum::serve(listener, app)
        .await
        .expect("server exited unexpectedly");
}
