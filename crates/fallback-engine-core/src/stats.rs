//! Thread-safe global and per-processor counters (§4.4).
//!
//! A single mutex guards a plain struct, matching the teacher's preference
//! for a short, pure-bookkeeping critical section over lock-free
//! gymnastics (§9) — contention here is low and the work inside the lock
//! is a handful of integer adds.

use crate::models::{Decimal2, ProcessorResult, ProcessorStatus};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProcessorCounters {
    pub attempts: u64,
    pub success: u64,
    pub soft_decline: u64,
    pub hard_decline: u64,
    pub rate_limited: u64,
    pub timeout: u64,
    pub latency_sum_ms: u64,
    pub volume_cents: i64,
    pub fees_cents: i64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProcessorStatsSnapshot {
    pub counters: ProcessorCounters,
    pub mean_latency_ms: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSnapshot {
    pub total_transactions: u64,
    pub total_approved: u64,
    pub total_declined: u64,
    pub approval_rate: f64,
    pub approved_volume_cents: i64,
    pub approved_fees_cents: i64,
    pub uptime: std::time::Duration,
    pub per_processor: HashMap<String, ProcessorStatsSnapshot>,
}

struct Inner {
    total_transactions: u64,
    total_approved: u64,
    total_declined: u64,
    approved_volume_cents: i64,
    approved_fees_cents: i64,
    per_processor: HashMap<String, ProcessorCounters>,
}

pub struct StatsService {
    started_at: Instant,
    inner: Mutex<Inner>,
}

impl StatsService {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            inner: Mutex::new(Inner {
                total_transactions: 0,
                total_approved: 0,
                total_declined: 0,
                approved_volume_cents: 0,
                approved_fees_cents: 0,
                per_processor: HashMap::new(),
            }),
        }
    }

    /// Records one completed `charge` call (never a circuit-skipped step).
    pub fn record_attempt(&self, result: &ProcessorResult) {
        let mut inner = self.inner.lock().unwrap();
        let counters = inner
            .per_processor
            .entry(result.processor_name.clone())
            .or_default();
        counters.attempts += 1;
        counters.latency_sum_ms += result.latency_ms;
        match result.status {
            ProcessorStatus::Success => {
                counters.success += 1;
                counters.volume_cents += result.amount.cents();
                if let Some(fee) = result.fee {
                    counters.fees_cents += fee.cents();
                }
            }
            ProcessorStatus::SoftDecline => counters.soft_decline += 1,
            ProcessorStatus::HardDecline => counters.hard_decline += 1,
            ProcessorStatus::RateLimited => counters.rate_limited += 1,
            ProcessorStatus::Timeout => counters.timeout += 1,
            ProcessorStatus::CircuitOpen => {
                // Never reached: circuit-skipped steps are not attempts (§4.6.3).
            }
        }
    }

    /// Records the terminal decision for one transaction.
    pub fn record_final(&self, approved: bool, amount: Decimal2, fee: Option<Decimal2>) {
        let mut inner = self.inner.lock().unwrap();
        inner.total_transactions += 1;
        if approved {
            inner.total_approved += 1;
            inner.approved_volume_cents += amount.cents();
            if let Some(fee) = fee {
                inner.approved_fees_cents += fee.cents();
            }
        } else {
            inner.total_declined += 1;
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap();
        let approval_rate = if inner.total_transactions == 0 {
            0.0
        } else {
            inner.total_approved as f64 / inner.total_transactions as f64
        };
        let per_processor = inner
            .per_processor
            .iter()
            .map(|(name, counters)| {
                let mean_latency_ms = if counters.attempts == 0 {
                    0.0
                } else {
                    counters.latency_sum_ms as f64 / counters.attempts as f64
                };
                (
                    name.clone(),
                    ProcessorStatsSnapshot {
                        counters: counters.clone(),
                        mean_latency_ms,
                    },
                )
            })
            .collect();

        StatsSnapshot {
            total_transactions: inner.total_transactions,
            total_approved: inner.total_approved,
            total_declined: inner.total_declined,
            approval_rate,
            approved_volume_cents: inner.approved_volume_cents,
            approved_fees_cents: inner.approved_fees_cents,
            uptime: self.started_at.elapsed(),
            per_processor,
        }
    }
}

impl Default for StatsService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeclineType;

    #[test]
    fn record_final_partitions_approved_and_declined() {
        let stats = StatsService::new();
        for _ in 0..3 {
            stats.record_final(true, Decimal2::from_cents(10_000), Some(Decimal2::from_cents(250)));
        }
        for _ in 0..2 {
            stats.record_final(false, Decimal2::from_cents(10_000), None);
        }
        let snap = stats.snapshot();
        assert_eq!(snap.total_approved + snap.total_declined, 5);
        assert_eq!(snap.total_approved, 3);
        assert_eq!(snap.total_declined, 2);
        assert_eq!(snap.approved_volume_cents, 30_000);
        assert_eq!(snap.approved_fees_cents, 750);
    }

    #[test]
    fn approval_rate_is_zero_with_no_transactions() {
        let stats = StatsService::new();
        assert_eq!(stats.snapshot().approval_rate, 0.0);
    }

    #[test]
    fn per_processor_mean_latency_is_zero_when_no_attempts() {
        let stats = StatsService::new();
        let snap = stats.snapshot();
        assert!(snap.per_processor.is_empty());
    }

    #[test]
    fn record_attempt_accumulates_per_processor_counters() {
        let stats = StatsService::new();
        stats.record_attempt(&ProcessorResult::success(
            "VortexPay",
            Decimal2::from_cents(10_000),
            0.025,
            40,
        ));
        stats.record_attempt(&ProcessorResult::decline(
            "VortexPay",
            ProcessorStatus::SoftDecline,
            DeclineType::Soft,
            "insufficient_funds",
            Decimal2::from_cents(10_000),
            60,
        ));
        let snap = stats.snapshot();
        let vortex = snap.per_processor.get("VortexPay").unwrap();
        assert_eq!(vortex.counters.attempts, 2);
        assert_eq!(vortex.counters.success, 1);
        assert_eq!(vortex.counters.soft_decline, 1);
        assert_eq!(vortex.mean_latency_ms, 50.0);
    }
}
