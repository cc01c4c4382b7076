use super::{DetailKind, Page, ResourceClient, ResourceKind, Result};
use crate::core::{retry_with_policy, RetryPolicy};
use async_trait::async_trait;
use serde_json::Value;

/// Retries transient failures of the wrapped client.
///
/// Only [`super::ClientError::TransientNetwork`] is retried; `NotFound` and
/// decode errors pass through on the first attempt.
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: ResourceClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

#[async_trait]
impl<C: ResourceClient> ResourceClient for RetryingClient<C> {
    async fn get_account(&self) -> Result<Value> {
        retry_with_policy(self.policy, |_| self.inner.get_account()).await
    }

    async fn fetch_page(&self, kind: ResourceKind, page: u32) -> Result<Page> {
        retry_with_policy(self.policy, |_| self.inner.fetch_page(kind, page)).await
    }

    async fn fetch_detail(
        &self,
        kind: DetailKind,
        parent_id: u64,
        resource_id: u64,
    ) -> Result<Option<Value>> {
        retry_with_policy(self.policy, |attempt| {
            if attempt > 1 {
                tracing::debug!(
                    path = %kind.path(parent_id, resource_id),
                    attempt,
                    "retrying detail request"
                );
            }
            self.inner.fetch_detail(kind, parent_id, resource_id)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientError, InMemoryClient};
    use serde_json::json;
    use std::time::Duration;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let inner = InMemoryClient::new()
            .with_detail(DetailKind::MergeRequestApprovals, 5, 3, json!({"approved": false}))
            .with_transient_failures(DetailKind::MergeRequestApprovals, 5, 3, 2);
        let client = RetryingClient::new(inner, fast_policy(3));

        let value = client
            .fetch_detail(DetailKind::MergeRequestApprovals, 5, 3)
            .await
            .unwrap();

        assert_eq!(value, Some(json!({"approved": false})));
        assert_eq!(client.inner().detail_requests(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let inner = InMemoryClient::new().with_transient_failures(
            DetailKind::MergeRequestApprovals,
            5,
            3,
            10,
        );
        let client = RetryingClient::new(inner, fast_policy(2));

        let err = client
            .fetch_detail(DetailKind::MergeRequestApprovals, 5, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::TransientNetwork { .. }));
        assert_eq!(client.inner().detail_requests(), 2);
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let client = RetryingClient::new(InMemoryClient::new(), fast_policy(5));

        let err = client
            .fetch_detail(DetailKind::MergeRequestApprovals, 1, 1)
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(client.inner().detail_requests(), 1);
    }
}
