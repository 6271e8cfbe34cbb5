//! The recognised configuration surface (§6.3), read once at construction.
//!
//! No config *file* format and no hot reload — matching the teacher's
//! builder pattern, every knob has a hardcoded default and an optional
//! override, except here the override source is the environment rather
//! than builder calls, since this is an application rather than a
//! publishable middleware library (§9 / SPEC_FULL §4.9).

use crate::backoff::BackoffPolicy;
use crate::breaker::BreakerConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub breaker: BreakerConfig,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub backoff_max_retries: u32,
    pub processor_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            backoff_base: Duration::from_secs_f64(0.5),
            backoff_cap: Duration::from_secs_f64(30.0),
            backoff_max_retries: 2,
            processor_timeout: Duration::from_secs_f64(3.0),
        }
    }
}

impl EngineConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.backoff_base, self.backoff_cap)
    }

    /// Reads the `CB_*` / `BACKOFF_*` / `PROCESSOR_TIMEOUT_SECONDS`
    /// variables of §6.3. A missing or unparseable variable falls back to
    /// the default and logs a warning rather than failing startup.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            breaker: BreakerConfig {
                window_size: env_parse("CB_ROLLING_WINDOW_SIZE", default.breaker.window_size),
                window: Duration::from_secs_f64(env_parse(
                    "CB_ROLLING_WINDOW_SECONDS",
                    default.breaker.window.as_secs_f64(),
                )),
                trip_threshold: env_parse("CB_TRIP_THRESHOLD", default.breaker.trip_threshold),
                cooldown: Duration::from_secs_f64(env_parse(
                    "CB_COOLDOWN_SECONDS",
                    default.breaker.cooldown.as_secs_f64(),
                )),
            },
            backoff_base: Duration::from_secs_f64(env_parse(
                "BACKOFF_BASE_SECONDS",
                default.backoff_base.as_secs_f64(),
            )),
            backoff_cap: Duration::from_secs_f64(env_parse(
                "BACKOFF_MAX_SECONDS",
                default.backoff_cap.as_secs_f64(),
            )),
            backoff_max_retries: env_parse("BACKOFF_MAX_RETRIES", default.backoff_max_retries),
            processor_timeout: Duration::from_secs_f64(env_parse(
                "PROCESSOR_TIMEOUT_SECONDS",
                default.processor_timeout.as_secs_f64(),
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "failed to parse config value, using default");
            default
        }),
        Err(_) => default,
    }
}
