//! Fallback orchestration engine and per-processor circuit breaker for
//! payment processing (§1–§5 of the domain spec).
//!
//! This crate has no I/O: the HTTP surface, processor implementations and
//! process configuration live in `fallback-engine-service`. Everything
//! here is deterministic given its inputs except for jittered backoff
//! delays and wall-clock timestamps.

mod backoff;
mod breaker;
mod cache;
mod config;
mod engine;
mod models;
mod processor;
mod registry;
mod stats;

pub use backoff::BackoffPolicy;
pub use breaker::{BreakerConfig, BreakerSnapshot, BreakerState, CircuitBreaker};
pub use config::EngineConfig;
pub use engine::FallbackEngine;
pub use models::{
    Currency, Decimal2, DeclineType, ProcessorResult, ProcessorStatus, ResponseStatus,
    TransactionRequest, TransactionResponse, ValidationError,
};
pub use processor::Processor;
pub use registry::BreakerRegistry;
pub use stats::{ProcessorCounters, ProcessorStatsSnapshot, StatsService, StatsSnapshot};
