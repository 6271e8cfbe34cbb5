//! axum handlers translating HTTP requests into core engine calls (§6.1).
//!
//! Grounded on the teacher's `axum-resilient-kv-store` example: an
//! `AppState` wrapping the shared service behind an `Arc`, handlers that
//! borrow it via `State<AppState>`, and admin endpoints alongside the
//! primary one.

use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use fallback_engine_core::{FallbackEngine, TransactionRequest, TransactionResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FallbackEngine>,
}

pub async fn post_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::InvalidRequest(e.to_string()))?;

    let span = tracing::info_span!("transaction", transaction_id = %request.transaction_id);
    let _guard = span.enter();

    let response = state.engine.process(request).await;
    Ok(Json(response))
}

fn known_processor(state: &AppState, name: &str) -> bool {
    state.engine.processors().iter().any(|p| p.name() == name)
}

pub async fn get_processors_status(State(state): State<AppState>) -> Json<Value> {
    let statuses: Vec<Value> = state
        .engine
        .processors()
        .iter()
        .map(|p| {
            let snapshot = state.engine.registry().get(p.name()).status_snapshot();
            json!({
                "name": p.name(),
                "fee_rate": p.fee_rate(),
                "status": snapshot,
            })
        })
        .collect();
    Json(Value::Array(statuses))
}

pub async fn post_processor_reset(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !known_processor(&state, &name) {
        return Err(AppError::UnknownProcessor(name));
    }
    let breaker = state.engine.registry().get(&name);
    breaker.reset();
    Ok(Json(json!({ "name": name, "status": breaker.status_snapshot() })))
}

#[derive(Deserialize)]
pub struct InjectFailuresQuery {
    count: u32,
}

pub async fn post_processor_inject_failures(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<InjectFailuresQuery>,
) -> Result<Json<Value>, AppError> {
    if !(1..=200).contains(&query.count) {
        return Err(AppError::InvalidInjectionCount(query.count));
    }
    if !known_processor(&state, &name) {
        return Err(AppError::UnknownProcessor(name));
    }
    let breaker = state.engine.registry().get(&name);
    breaker.inject_failures(query.count);
    tracing::warn!(processor = %name, count = query.count, "failures injected via admin endpoint");
    Ok(Json(json!({ "name": name, "status": breaker.status_snapshot() })))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.engine.stats().snapshot();
    Json(json!(snapshot))
}

pub async fn get_health_live() -> StatusCode {
    StatusCode::OK
}
