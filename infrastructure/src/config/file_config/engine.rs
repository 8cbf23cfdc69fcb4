//! Engine tuning from TOML (`[engine]` section)

use mdt_application::EngineParams;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry, intervention wait and cancellation drain settings.
///
/// `intervention_timeout_secs = 0` waits for the human indefinitely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub intervention_timeout_secs: u64,
    pub drain_grace_ms: u64,
    pub max_follow_ups_per_pause: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let defaults = EngineParams::default();
        Self {
            max_retries: defaults.max_retries,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
            intervention_timeout_secs: defaults
                .intervention_timeout
                .map(|t| t.as_secs())
                .unwrap_or(0),
            drain_grace_ms: defaults.drain_grace.as_millis() as u64,
            max_follow_ups_per_pause: defaults.max_follow_ups_per_pause,
        }
    }
}

impl FileEngineConfig {
    pub fn to_engine_params(&self) -> EngineParams {
        let timeout = (self.intervention_timeout_secs > 0)
            .then(|| Duration::from_secs(self.intervention_timeout_secs));
        EngineParams::default()
            .with_max_retries(self.max_retries)
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
            .with_intervention_timeout(timeout)
            .with_drain_grace(Duration::from_millis(self.drain_grace_ms))
            .with_max_follow_ups_per_pause(self.max_follow_ups_per_pause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_defaults() {
        let params = FileEngineConfig::default().to_engine_params();
        let defaults = EngineParams::default();
        assert_eq!(params.max_retries, defaults.max_retries);
        assert_eq!(params.retry_backoff, defaults.retry_backoff);
        assert_eq!(params.intervention_timeout, defaults.intervention_timeout);
        assert_eq!(params.drain_grace, defaults.drain_grace);
    }

    #[test]
    fn test_zero_timeout_waits_forever() {
        let config = FileEngineConfig {
            intervention_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.to_engine_params().intervention_timeout, None);
    }
}
