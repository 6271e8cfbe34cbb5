//! Per-processor circuit breaker: a dual-constraint rolling-window state
//! machine guarding every attempt (§4.2).
//!
//! Grounded on the teacher's `circuit.rs` `Circuit` type — a mutex-guarded
//! inner struct with a sample buffer, an explicit state enum, and a
//! `transition_to` that resets counters on every change. The teacher offers
//! count-based *or* time-based windows selected by a config flag; this
//! breaker enforces both constraints simultaneously on every insertion, per
//! §4.2's "both constraints apply on every insertion."

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Current lifecycle state of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// Tunables shared by every breaker the registry creates (§6.3).
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    pub window_size: usize,
    pub window: Duration,
    pub trip_threshold: f64,
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            window: Duration::from_secs_f64(300.0),
            trip_threshold: 0.20,
            cooldown: Duration::from_secs_f64(120.0),
        }
    }
}

/// Minimum number of samples in the window before a trip is even
/// considered, so a cold breaker never trips on its first few calls (§4.2).
const MIN_SAMPLES_TO_TRIP: usize = 5;

struct Sample {
    at: Instant,
    success: bool,
}

/// Point-in-time view of a breaker, safe to hand out without holding the
/// lock (mirrors the teacher's `CircuitMetrics`).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub total_samples: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub success_rate: Option<f64>,
    pub last_failure_age: Option<Duration>,
    pub cooldown_remaining: Option<Duration>,
}

struct Inner {
    state: BreakerState,
    window: VecDeque<Sample>,
    opened_at: Option<Instant>,
    last_failure_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            last_failure_at: None,
            probe_in_flight: false,
        }
    }

    fn evict_stale(&mut self, config: &BreakerConfig, now: Instant) {
        while self
            .window
            .front()
            .is_some_and(|s| now.duration_since(s.at) > config.window)
        {
            self.window.pop_front();
        }
        while self.window.len() > config.window_size {
            self.window.pop_front();
        }
    }

    fn push_sample(&mut self, config: &BreakerConfig, success: bool, now: Instant) {
        self.window.push_back(Sample { at: now, success });
        self.evict_stale(config, now);
        if !success {
            self.last_failure_at = Some(now);
        }
    }

    fn counts(&self) -> (usize, usize, usize) {
        let total = self.window.len();
        let success = self.window.iter().filter(|s| s.success).count();
        (total, success, total - success)
    }

    fn transition(&mut self, to: BreakerState, now: Instant) {
        if self.state == to {
            return;
        }
        tracing::info!(from = ?self.state, to = ?to, "circuit breaker state transition");
        self.state = to;
        match to {
            BreakerState::Open => {
                self.opened_at = Some(now);
                self.probe_in_flight = false;
            }
            BreakerState::HalfOpen => {
                self.probe_in_flight = true;
            }
            BreakerState::Closed => {
                self.window.clear();
                self.opened_at = None;
                self.probe_in_flight = false;
            }
        }
    }

    fn evaluate_trip(&mut self, config: &BreakerConfig, now: Instant) {
        let (total, success, _failure) = self.counts();
        if total < MIN_SAMPLES_TO_TRIP {
            return;
        }
        let rate = success as f64 / total as f64;
        if rate < config.trip_threshold {
            self.transition(BreakerState::Open, now);
        }
    }
}

/// A single processor's breaker. All operations serialize through one
/// mutex; critical sections never await or sleep (§5).
pub struct CircuitBreaker {
    inner: std::sync::Mutex<Inner>,
    config: BreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            inner: std::sync::Mutex::new(Inner::new()),
            config,
        }
    }

    /// Returns whether a call is permitted right now, performing the
    /// OPEN -> HALF_OPEN cooldown transition as a side effect (§4.2).
    pub fn allow_request(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let opened_at = inner.opened_at.unwrap_or(now);
                if now.duration_since(opened_at) >= self.config.cooldown {
                    inner.transition(BreakerState::HalfOpen, now);
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    // probe already claimed by a previous caller this half-open period,
                    // unless that caller already resolved it (probe_in_flight cleared on
                    // record_success/record_failure, not here).
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    pub fn record_success(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.push_sample(&self.config, true, now);
        match inner.state {
            BreakerState::HalfOpen => inner.transition(BreakerState::Closed, now),
            BreakerState::Closed => inner.evaluate_trip(&self.config, now),
            BreakerState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.push_sample(&self.config, false, now);
        match inner.state {
            BreakerState::HalfOpen => inner.transition(BreakerState::Open, now),
            BreakerState::Closed => inner.evaluate_trip(&self.config, now),
            BreakerState::Open => {}
        }
    }

    pub fn reset(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.window.clear();
        inner.last_failure_at = None;
        inner.transition(BreakerState::Closed, now);
    }

    /// Admin/test-only: append `n` failure samples and evaluate tripping.
    pub fn inject_failures(&self, n: u32) {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        for _ in 0..n {
            inner.push_sample(&self.config, false, now);
        }
        if inner.state == BreakerState::Closed {
            inner.evaluate_trip(&self.config, now);
        }
    }

    pub fn status_snapshot(&self) -> BreakerSnapshot {
        let now = Instant::now();
        let mut inner = self.inner.lock().unwrap();
        inner.evict_stale(&self.config, now);
        let (total, success, failure) = inner.counts();
        BreakerSnapshot {
            state: inner.state,
            total_samples: total,
            success_count: success,
            failure_count: failure,
            success_rate: if total == 0 {
                None
            } else {
                Some(success as f64 / total as f64)
            },
            last_failure_age: inner.last_failure_at.map(|t| now.duration_since(t)),
            cooldown_remaining: match inner.state {
                BreakerState::Open => inner.opened_at.map(|opened| {
                    self.config
                        .cooldown
                        .saturating_sub(now.duration_since(opened))
                }),
                _ => None,
            },
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BreakerConfig {
        BreakerConfig {
            window_size: 10,
            window: Duration::from_secs(300),
            trip_threshold: 0.20,
            cooldown: Duration::from_millis(50),
        }
    }

    #[test]
    fn stays_closed_below_minimum_samples_even_at_zero_success() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn trips_open_once_minimum_met_and_below_threshold() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..5 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_permits_exactly_one_probe() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..6 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), BreakerState::Open);
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn half_open_success_closes_and_failure_reopens() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..6 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.allow_request());
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);

        for _ in 0..6 {
            breaker.record_failure();
        }
        std::thread::sleep(Duration::from_millis(60));
        assert!(breaker.allow_request());
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn window_never_exceeds_configured_size() {
        let breaker = CircuitBreaker::new(BreakerConfig {
            window_size: 5,
            ..fast_config()
        });
        for i in 0..20 {
            if i % 2 == 0 {
                breaker.record_success();
            } else {
                breaker.record_failure();
            }
        }
        let snap = breaker.status_snapshot();
        assert!(snap.total_samples <= 5);
    }

    #[test]
    fn inject_failures_can_trip_an_empty_breaker() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.inject_failures(6);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn reset_clears_to_closed() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.inject_failures(6);
        assert_eq!(breaker.state(), BreakerState::Open);
        breaker.reset();
        assert_eq!(breaker.state(), BreakerState::Closed);
        let snap = breaker.status_snapshot();
        assert_eq!(snap.total_samples, 0);
    }
}
