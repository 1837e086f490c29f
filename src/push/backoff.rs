use std::time::Duration;

use crate::config::PushConfig;

/// Exponential reconnect backoff with deterministic jitter. The attempt
/// counter resets on a successful connect.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    base_ms: u64,
    max_ms: u64,
}

impl ReconnectPolicy {
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms: base_ms.max(1),
            max_ms: max_ms.max(1),
        }
    }

    pub fn from_config(config: &PushConfig) -> Self {
        Self::new(config.backoff_base_ms, config.backoff_max_ms)
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let base = self.base_ms as f64;
        let max = self.max_ms as f64;
        let exp = (attempt as i32).max(0).min(32);
        let without_jitter = (base * 2f64.powi(exp)).min(max);
        let jitter_factor = 0.9 + (attempt as f64 % 3.0) * 0.05;
        Duration::from_millis((without_jitter * jitter_factor) as u64)
    }
}
