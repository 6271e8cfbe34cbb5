//! The engine's dependency on processors (§4.5, §6.2).
//!
//! Mirrors the teacher's `FallbackFn` alias shape (`Arc<dyn Fn(..) ->
//! BoxFuture<..> + Send + Sync>`) but as a named trait rather than a bare
//! closure type, since a processor also carries identity (`name`) and
//! pricing (`fee_rate`) alongside the call itself.

use crate::models::{ProcessorResult, TransactionRequest};
use futures::future::BoxFuture;

/// A downstream payment processor. `charge` must never panic or block the
/// executor thread; every failure mode is encoded in the returned
/// `ProcessorResult` (it never returns `CircuitOpen` — that status is
/// reserved for the engine).
pub trait Processor: Send + Sync {
    fn name(&self) -> &str;
    fn fee_rate(&self) -> f64;
    fn charge(&self, request: &TransactionRequest) -> BoxFuture<'static, ProcessorResult>;
}
