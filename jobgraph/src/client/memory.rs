//! Fixture-backed [`ResourceClient`].
//!
//! Serves collections and details registered up front, paginating
//! collections the same way the remote API does. Failures can be injected
//! per detail, and request counters let tests assert how the steps used the
//! client.

use super::{ClientError, DetailKind, Page, ResourceClient, ResourceKind, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

const DEFAULT_PAGE_SIZE: usize = 100;

type DetailAddress = (DetailKind, u64, u64);

pub struct InMemoryClient {
    account: Option<Value>,
    collections: HashMap<ResourceKind, Vec<Value>>,
    details: HashMap<DetailAddress, Value>,
    page_size: usize,
    latency: Option<Duration>,
    /// Remaining injected failures per detail
    failures: DashMap<DetailAddress, u32>,
    page_requests: AtomicUsize,
    detail_requests: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self {
            account: None,
            collections: HashMap::new(),
            details: HashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            latency: None,
            failures: DashMap::new(),
            page_requests: AtomicUsize::new(0),
            detail_requests: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_account(mut self, account: Value) -> Self {
        self.account = Some(account);
        self
    }

    /// Registers the records of a collection, replacing earlier ones.
    pub fn with_collection(mut self, kind: ResourceKind, records: Vec<Value>) -> Self {
        self.collections.insert(kind, records);
        self
    }

    pub fn with_detail(
        mut self,
        kind: DetailKind,
        parent_id: u64,
        resource_id: u64,
        value: Value,
    ) -> Self {
        self.details.insert((kind, parent_id, resource_id), value);
        self
    }

    /// Records per page. Zero is treated as one.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Simulated latency of every detail request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes the next `times` requests for a detail fail with
    /// [`ClientError::TransientNetwork`].
    pub fn with_transient_failures(
        self,
        kind: DetailKind,
        parent_id: u64,
        resource_id: u64,
        times: u32,
    ) -> Self {
        self.failures.insert((kind, parent_id, resource_id), times);
        self
    }

    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }

    pub fn detail_requests(&self) -> usize {
        self.detail_requests.load(Ordering::SeqCst)
    }

    /// Highest number of detail requests observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn take_failure(&self, address: &DetailAddress) -> bool {
        match self.failures.get_mut(address) {
            Some(mut remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for InMemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceClient for InMemoryClient {
    async fn get_account(&self) -> Result<Value> {
        self.account
            .clone()
            .ok_or_else(|| ClientError::not_found("user"))
    }

    async fn fetch_page(&self, kind: ResourceKind, page: u32) -> Result<Page> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);

        let records = self.collections.get(&kind).map(Vec::as_slice).unwrap_or(&[]);
        let start = (page.max(1) as usize - 1) * self.page_size;
        let end = (start + self.page_size).min(records.len());

        let items = records.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();
        let next_page = (end < records.len()).then(|| page + 1);

        Ok(Page { items, next_page })
    }

    async fn fetch_detail(
        &self,
        kind: DetailKind,
        parent_id: u64,
        resource_id: u64,
    ) -> Result<Option<Value>> {
        self.detail_requests.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(&self.in_flight, &self.max_in_flight);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let address = (kind, parent_id, resource_id);
        if self.take_failure(&address) {
            return Err(ClientError::transient(format!(
                "connection reset: {}",
                kind.path(parent_id, resource_id)
            )));
        }

        match self.details.get(&address) {
            Some(value) => Ok(Some(value.clone())),
            None => Err(ClientError::not_found(kind.path(parent_id, resource_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_pages_are_one_indexed() {
        let client = InMemoryClient::new().with_page_size(2).with_collection(
            ResourceKind::Projects,
            vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})],
        );

        let first = client.fetch_page(ResourceKind::Projects, 1).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page, Some(2));

        let second = client.fetch_page(ResourceKind::Projects, 2).await.unwrap();
        assert_eq!(second.items, vec![json!({"id": 3})]);
        assert_eq!(second.next_page, None);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let client = InMemoryClient::new();
        let page = client.fetch_page(ResourceKind::Users, 1).await.unwrap();
        assert_eq!(page, Page::default());
    }

    #[tokio::test]
    async fn test_missing_account_is_not_found() {
        let err = InMemoryClient::new().get_account().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_injected_failures_run_out() {
        let client = InMemoryClient::new()
            .with_detail(DetailKind::MergeRequestApprovals, 1, 2, json!({"approved": true}))
            .with_transient_failures(DetailKind::MergeRequestApprovals, 1, 2, 2);

        for _ in 0..2 {
            let err = client
                .fetch_detail(DetailKind::MergeRequestApprovals, 1, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::TransientNetwork { .. }));
        }

        let value = client
            .fetch_detail(DetailKind::MergeRequestApprovals, 1, 2)
            .await
            .unwrap();
        assert_eq!(value, Some(json!({"approved": true})));
        assert_eq!(client.detail_requests(), 3);
    }
}
