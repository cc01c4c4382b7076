use crate::core::RetryPolicy;
use crate::graph::StepId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Run-wide settings handed to every step through its context.
///
/// Deserializes from any serde format; missing fields take their defaults.
///
/// ```
/// use jobgraph::executor::ExecutorConfig;
///
/// let config: ExecutorConfig = serde_json::from_str(
///     r#"{ "max_concurrent_requests": 2, "disabled_steps": ["fetch-users"] }"#,
/// ).unwrap();
///
/// assert_eq!(config.max_concurrent_requests(), 2);
/// assert!(config.is_disabled("fetch-users"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Upper bound on remote calls a single step keeps in flight.
    pub max_concurrent_requests: usize,

    /// Steps that are skipped. They still satisfy their dependents.
    pub disabled_steps: BTreeSet<StepId>,

    /// Applied by [`crate::client::RetryingClient`] when the caller wraps
    /// its client; the executor itself never retries.
    pub retry_policy: RetryPolicy,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_requests(mut self, limit: usize) -> Self {
        self.max_concurrent_requests = limit;
        self
    }

    pub fn disable_step(mut self, step: impl Into<StepId>) -> Self {
        self.disabled_steps.insert(step.into());
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Effective concurrency bound, never below one.
    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent_requests.max(1)
    }

    pub fn is_disabled(&self, step: &str) -> bool {
        self.disabled_steps.contains(step)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            disabled_steps: BTreeSet::new(),
            retry_policy: RetryPolicy::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_concurrent_requests(), 5);
        assert!(config.disabled_steps.is_empty());
        assert_eq!(config.retry_policy, RetryPolicy::NONE);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = ExecutorConfig::new().with_max_concurrent_requests(0);
        assert_eq!(config.max_concurrent_requests(), 1);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: ExecutorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ExecutorConfig::default());
    }
}
