//! In-memory idempotency cache, TTL 24h (§4.6.1).
//!
//! Accepts the documented TOCTOU: a concurrent caller that observes a
//! "processing" sentinel does not block, it proceeds as an independent
//! processor of the same transaction id, and the last terminal write wins.
//! Stronger single-flight coordination is explicitly not required (§9
//! Open Question a).

use crate::models::TransactionResponse;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

enum Entry {
    Processing(Instant),
    Done(TransactionResponse, Instant),
}

pub struct IdempotencyCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl IdempotencyCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached terminal response if one exists and hasn't
    /// expired. Otherwise claims the slot with a fresh "processing"
    /// sentinel (overwriting any stale or in-flight sentinel — last write
    /// wins) and returns `None`, meaning the caller should do the work.
    pub fn check_and_claim(&self, transaction_id: &str) -> Option<TransactionResponse> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        if let Some(Entry::Done(response, stored_at)) = entries.get(transaction_id) {
            if now.duration_since(*stored_at) < CACHE_TTL {
                return Some(response.clone());
            }
        }
        entries.insert(transaction_id.to_string(), Entry::Processing(now));
        None
    }

    /// Replaces the sentinel with the terminal response and sweeps every
    /// entry older than the TTL, bounding cache growth under sustained
    /// load (§9).
    pub fn store_and_evict(&self, transaction_id: &str, response: TransactionResponse) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.insert(transaction_id.to_string(), Entry::Done(response, now));
        entries.retain(|_, entry| {
            let age = match entry {
                Entry::Processing(since) => now.duration_since(*since),
                Entry::Done(_, stored_at) => now.duration_since(*stored_at),
            };
            age < CACHE_TTL
        });
    }
}

impl Default for IdempotencyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Decimal2, ResponseStatus};
    use std::time::SystemTime;

    fn dummy_response(id: &str) -> TransactionResponse {
        TransactionResponse {
            transaction_id: id.to_string(),
            status: ResponseStatus::Approved,
            processor_used: Some("VortexPay".to_string()),
            amount: Decimal2::from_cents(10_000),
            currency: Currency::BRL,
            fee: Some(Decimal2::from_cents(250)),
            fee_rate: Some(0.025),
            decline_reason: None,
            decline_type: None,
            attempts: 1,
            processors_tried: vec!["VortexPay(success)".to_string()],
            retry_log: vec![],
            latency_ms: 12,
            processed_at: SystemTime::now(),
        }
    }

    #[test]
    fn first_claim_on_unseen_id_returns_none() {
        let cache = IdempotencyCache::new();
        assert!(cache.check_and_claim("tx-1").is_none());
    }

    #[test]
    fn replay_after_store_returns_identical_response() {
        let cache = IdempotencyCache::new();
        assert!(cache.check_and_claim("tx-1").is_none());
        let response = dummy_response("tx-1");
        cache.store_and_evict("tx-1", response.clone());

        let replayed = cache.check_and_claim("tx-1").expect("cached response");
        assert_eq!(replayed.processed_at, response.processed_at);
        assert_eq!(replayed.transaction_id, response.transaction_id);
    }

    #[test]
    fn concurrent_processing_sentinel_does_not_block_second_caller() {
        let cache = IdempotencyCache::new();
        assert!(cache.check_and_claim("tx-1").is_none());
        // A second caller observing the sentinel proceeds independently.
        assert!(cache.check_and_claim("tx-1").is_none());
    }
}
