//! Lazily-created, race-free per-processor breaker ownership (§4.3).

use crate::breaker::{BreakerConfig, CircuitBreaker};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub struct BreakerRegistry {
    config: BreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl BreakerRegistry {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `name`, constructing it on first use.
    /// Concurrent callers for the same name always observe one instance.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config)))
            .clone()
    }

    pub fn all_names(&self) -> Vec<String> {
        self.breakers.lock().unwrap().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_same_instance_for_same_name() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let a = registry.get("VortexPay");
        let b = registry.get("VortexPay");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_names_get_distinct_breakers() {
        let registry = BreakerRegistry::new(BreakerConfig::default());
        let a = registry.get("VortexPay");
        let b = registry.get("SwiftPay");
        assert!(!Arc::ptr_eq(&a, &b));
        let mut names = registry.all_names();
        names.sort();
        assert_eq!(names, vec!["SwiftPay".to_string(), "VortexPay".to_string()]);
    }

    #[test]
    fn concurrent_get_is_race_free() {
        let registry = Arc::new(BreakerRegistry::new(BreakerConfig::default()));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.get("VortexPay"))
            })
            .collect();
        let first = handles.into_iter().map(|h| h.join().unwrap()).reduce(|a, b| {
            assert!(Arc::ptr_eq(&a, &b));
            b
        });
        assert!(first.is_some());
    }
}
