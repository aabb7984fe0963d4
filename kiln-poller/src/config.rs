//! Poller configuration
//!
//! Defines the timing and retry parameters of a polling operation. The
//! configuration is an explicit value handed to [`PollingEngine`](crate::PollingEngine);
//! nothing is read from ambient state once the engine exists.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff;

/// How a valid but unfinished status is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Keep polling on the fixed delay without spending retry budget
    Poll,
    /// Treat "not done yet" as a retryable failure that spends retry budget
    Retry,
}

impl std::str::FromStr for PendingPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "poll" => Ok(PendingPolicy::Poll),
            "retry" => Ok(PendingPolicy::Retry),
            other => anyhow::bail!("unknown pending policy '{}' (expected poll or retry)", other),
        }
    }
}

/// Polling configuration
///
/// All delays are configurable to allow tuning for different deployments
/// and for fast tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Fixed delay applied after every non-terminal query
    pub poll_delay: Duration,

    /// Number of retries allowed after failed queries
    pub max_retries: u32,

    /// Backoff added to `poll_delay` on the first retry
    pub base_backoff: Duration,

    /// Upper bound of the backoff component
    pub max_backoff: Duration,

    pub pending_policy: PendingPolicy,

    /// Upper bound on the total number of queries, if any
    pub max_polls: Option<u32>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_delay: Duration::from_secs(3),
            max_retries: 10,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            pending_policy: PendingPolicy::Poll,
            max_polls: None,
        }
    }
}

impl PollerConfig {
    /// Creates configuration from environment variables
    ///
    /// Every variable is optional and falls back to the default:
    /// - KILN_POLL_DELAY_MS (default: 3000)
    /// - KILN_MAX_RETRIES (default: 10)
    /// - KILN_BASE_BACKOFF_MS (default: 1000)
    /// - KILN_MAX_BACKOFF_MS (default: 30000)
    /// - KILN_PENDING_POLICY (poll | retry, default: poll)
    /// - KILN_MAX_POLLS (default: unbounded)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let pending_policy = match std::env::var("KILN_PENDING_POLICY") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.pending_policy,
        };

        let config = Self {
            poll_delay: env_millis("KILN_POLL_DELAY_MS").unwrap_or(defaults.poll_delay),
            max_retries: env_parse("KILN_MAX_RETRIES").unwrap_or(defaults.max_retries),
            base_backoff: env_millis("KILN_BASE_BACKOFF_MS").unwrap_or(defaults.base_backoff),
            max_backoff: env_millis("KILN_MAX_BACKOFF_MS").unwrap_or(defaults.max_backoff),
            pending_policy,
            max_polls: env_parse("KILN_MAX_POLLS"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_backoff > self.max_backoff {
            anyhow::bail!("base_backoff must not exceed max_backoff");
        }

        if self.max_polls == Some(0) {
            anyhow::bail!("max_polls must be greater than 0");
        }

        if self.poll_delay.is_zero() && self.base_backoff.is_zero() && self.max_polls.is_none() {
            anyhow::bail!("poll_delay and base_backoff cannot both be zero without max_polls");
        }

        Ok(())
    }

    /// Delay before the next attempt after the `attempt`-th failure
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.poll_delay
            .saturating_add(backoff::exponential(attempt, self.base_backoff, self.max_backoff))
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.poll_delay, Duration::from_secs(3));
        assert_eq!(config.max_retries, 10);
        assert_eq!(config.max_backoff, Duration::from_secs(30));
        assert_eq!(config.pending_policy, PendingPolicy::Poll);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = PollerConfig::default();

        config.base_backoff = Duration::from_secs(60);
        assert!(config.validate().is_err());
        config.base_backoff = Duration::from_secs(1);

        config.max_polls = Some(0);
        assert!(config.validate().is_err());
        config.max_polls = None;

        config.poll_delay = Duration::ZERO;
        config.base_backoff = Duration::ZERO;
        assert!(config.validate().is_err());
        config.max_polls = Some(5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn retry_delay_adds_backoff_to_poll_delay() {
        let config = PollerConfig::default();
        assert_eq!(config.retry_delay(1), Duration::from_secs(4));
        assert_eq!(config.retry_delay(2), Duration::from_secs(5));
        assert_eq!(config.retry_delay(10), Duration::from_secs(33));
    }

    #[test]
    fn pending_policy_parsing() {
        assert_eq!("Retry".parse::<PendingPolicy>().unwrap(), PendingPolicy::Retry);
        assert_eq!("poll".parse::<PendingPolicy>().unwrap(), PendingPolicy::Poll);
        assert!("sometimes".parse::<PendingPolicy>().is_err());
    }

    #[test]
    fn pending_policy_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PendingPolicy::Retry).unwrap(), "\"retry\"");
        let policy: PendingPolicy = serde_json::from_str("\"poll\"").unwrap();
        assert_eq!(policy, PendingPolicy::Poll);
    }
}
