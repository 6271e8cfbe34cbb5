//! The orchestrator: ordering, breaker guards, timeout, rate-limit backoff,
//! and idempotent replay around a single `process` call (§4.6).
//!
//! The attempt loop's shape — check a retry predicate, check the retry
//! budget, compute the backoff delay, sleep, log, try again — mirrors the
//! teacher's retry-layer loop in `tower-resilience-retry`. The difference
//! is what triggers a retry: here it is a single outcome variant
//! (`RATE_LIMITED`) against one processor, not a generic retry policy
//! across a `tower::Service`.

use crate::cache::IdempotencyCache;
use crate::config::EngineConfig;
use crate::models::{
    DeclineType, ProcessorResult, ProcessorStatus, ResponseStatus, TransactionRequest,
    TransactionResponse,
};
use crate::processor::Processor;
use crate::registry::BreakerRegistry;
use crate::stats::StatsService;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

pub struct FallbackEngine {
    processors: Vec<Arc<dyn Processor>>,
    registry: BreakerRegistry,
    stats: StatsService,
    cache: IdempotencyCache,
    config: EngineConfig,
}

impl FallbackEngine {
    pub fn new(processors: Vec<Arc<dyn Processor>>, config: EngineConfig) -> Self {
        Self {
            processors,
            registry: BreakerRegistry::new(config.breaker),
            stats: StatsService::new(),
            cache: IdempotencyCache::new(),
            config,
        }
    }

    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    pub fn registry(&self) -> &BreakerRegistry {
        &self.registry
    }

    pub fn processors(&self) -> &[Arc<dyn Processor>] {
        &self.processors
    }

    /// Orders the configured processors for one request (§4.6.2). BRL
    /// prefers PixFlow first; everyone else (and the BRL remainder) sorts
    /// by ascending `fee_rate`, ties broken by the input list order since
    /// `sort_by` is stable.
    fn order_for(&self, currency: crate::models::Currency) -> Vec<Arc<dyn Processor>> {
        use crate::models::Currency;

        if currency == Currency::BRL {
            if let Some(pos) = self.processors.iter().position(|p| p.name() == "PixFlow") {
                let pix = self.processors[pos].clone();
                let mut rest: Vec<_> = self
                    .processors
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != pos)
                    .map(|(_, p)| p.clone())
                    .collect();
                rest.sort_by(|a, b| a.fee_rate().partial_cmp(&b.fee_rate()).unwrap());
                let mut ordered = Vec::with_capacity(self.processors.len());
                ordered.push(pix);
                ordered.extend(rest);
                return ordered;
            }
        }

        let mut ordered = self.processors.clone();
        ordered.sort_by(|a, b| a.fee_rate().partial_cmp(&b.fee_rate()).unwrap());
        ordered
    }

    pub async fn process(&self, request: TransactionRequest) -> TransactionResponse {
        if let Some(cached) = self.cache.check_and_claim(&request.transaction_id) {
            tracing::info!(transaction_id = %request.transaction_id, "idempotent replay");
            return cached;
        }

        let started = Instant::now();
        let order = self.order_for(request.currency);
        let backoff = self.config.backoff_policy();

        let mut attempts: u32 = 0;
        let mut trail: Vec<String> = Vec::new();
        let mut retry_log: Vec<String> = Vec::new();
        let mut last_result: Option<ProcessorResult> = None;

        for processor in &order {
            let breaker = self.registry.get(processor.name());
            if !breaker.allow_request() {
                trail.push(format!("{}(circuit_open)", processor.name()));
                last_result = Some(ProcessorResult::circuit_open(processor.name(), request.amount));
                continue;
            }

            let mut terminal: Option<TransactionResponse> = None;

            for backoff_attempt in 0..=self.config.backoff_max_retries {
                if backoff_attempt > 0 {
                    let delay = backoff.delay(backoff_attempt - 1, true);
                    tokio::time::sleep(delay).await;
                    retry_log.push(format!(
                        "{}: retry {} after {}ms",
                        processor.name(),
                        backoff_attempt,
                        delay.as_millis()
                    ));
                }

                attempts += 1;
                let result = self.charge_with_timeout(processor.as_ref(), &request).await;
                self.stats.record_attempt(&result);
                tracing::info!(
                    processor = processor.name(),
                    status = result.status.as_tag(),
                    latency_ms = result.latency_ms,
                    "processor attempt"
                );

                match result.status {
                    ProcessorStatus::Success => {
                        breaker.record_success();
                        self.stats.record_final(true, result.amount, result.fee);
                        trail.push(format!("{}(success)", processor.name()));
                        let response = self.build_response(
                            &request,
                            ResponseStatus::Approved,
                            Some(processor.name().to_string()),
                            result.fee,
                            result.fee_rate,
                            None,
                            None,
                            attempts,
                            trail.clone(),
                            retry_log.clone(),
                            started,
                        );
                        self.cache.store_and_evict(&request.transaction_id, response.clone());
                        terminal = Some(response);
                    }
                    ProcessorStatus::HardDecline => {
                        breaker.record_failure();
                        self.stats.record_final(false, result.amount, None);
                        let code = result.decline_code.clone().unwrap_or_default();
                        trail.push(format!("{}(hard_decline:{code})", processor.name()));
                        let response = self.build_response(
                            &request,
                            ResponseStatus::Declined,
                            Some(processor.name().to_string()),
                            None,
                            None,
                            result.decline_code.clone(),
                            Some(DeclineType::Hard),
                            attempts,
                            trail.clone(),
                            retry_log.clone(),
                            started,
                        );
                        self.cache.store_and_evict(&request.transaction_id, response.clone());
                        terminal = Some(response);
                    }
                    ProcessorStatus::RateLimited => {
                        breaker.record_failure();
                        if backoff_attempt < self.config.backoff_max_retries {
                            trail.push(format!(
                                "{}(rate_limited:retry_{})",
                                processor.name(),
                                backoff_attempt + 1
                            ));
                        } else {
                            trail.push(format!("{}(rate_limited:exhausted)", processor.name()));
                        }
                    }
                    ProcessorStatus::SoftDecline | ProcessorStatus::Timeout => {
                        breaker.record_failure();
                        let tag = result.status.as_tag();
                        let code = result.decline_code.as_deref().unwrap_or("n/a");
                        trail.push(format!("{}({tag}:{code})", processor.name()));
                    }
                    ProcessorStatus::CircuitOpen => unreachable!(
                        "a processor implementation must never return CIRCUIT_OPEN (§6.2)"
                    ),
                }

                last_result = Some(result.clone());

                if terminal.is_some() {
                    break;
                }
                if matches!(result.status, ProcessorStatus::SoftDecline | ProcessorStatus::Timeout) {
                    break;
                }
                if result.status == ProcessorStatus::RateLimited
                    && backoff_attempt >= self.config.backoff_max_retries
                {
                    break;
                }
            }

            if let Some(response) = terminal {
                return response;
            }
        }

        self.stats.record_final(false, request.amount, None);
        let decline_reason = last_result
            .as_ref()
            .and_then(|r| r.decline_code.clone())
            .unwrap_or_else(|| "all_processors_failed".to_string());
        let decline_type = last_result
            .as_ref()
            .and_then(|r| r.decline_type)
            .unwrap_or(DeclineType::Soft);

        let response = self.build_response(
            &request,
            ResponseStatus::Declined,
            None,
            None,
            None,
            Some(decline_reason),
            Some(decline_type),
            attempts,
            trail,
            retry_log,
            started,
        );
        self.cache.store_and_evict(&request.transaction_id, response.clone());
        response
    }

    async fn charge_with_timeout(
        &self,
        processor: &dyn Processor,
        request: &TransactionRequest,
    ) -> ProcessorResult {
        match tokio::time::timeout(self.config.processor_timeout, processor.charge(request)).await
        {
            Ok(result) => result,
            Err(_) => ProcessorResult::timeout(
                processor.name(),
                request.amount,
                (self.config.processor_timeout.as_secs_f64() * 1000.0) as u64,
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_response(
        &self,
        request: &TransactionRequest,
        status: ResponseStatus,
        processor_used: Option<String>,
        fee: Option<crate::models::Decimal2>,
        fee_rate: Option<f64>,
        decline_reason: Option<String>,
        decline_type: Option<DeclineType>,
        attempts: u32,
        processors_tried: Vec<String>,
        retry_log: Vec<String>,
        started: Instant,
    ) -> TransactionResponse {
        TransactionResponse {
            transaction_id: request.transaction_id.clone(),
            status,
            processor_used,
            amount: request.amount,
            currency: request.currency,
            fee,
            fee_rate,
            decline_reason,
            decline_type,
            attempts,
            processors_tried,
            retry_log,
            latency_ms: started.elapsed().as_millis() as u64,
            processed_at: SystemTime::now(),
        }
    }
}
