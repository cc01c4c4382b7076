//! Remote resource client contract.
//!
//! Steps reach the remote platform only through [`ResourceClient`]: one
//! paginated listing call, one per-resource detail call, and the
//! authenticated account. Transport, authentication and
//! rate limiting live in implementations.
//!
//! Typed helpers on top of the raw calls come from [`ResourceClientExt`],
//! which every client gets for free:
//!
//! - [`ResourceClientExt::fetch_collection`]: pages flattened into one lazy stream
//! - [`ResourceClientExt::fetch_merge_request_approvals`]: `None` for missing data
//!
//! Implementations:
//!
//! - [`InMemoryClient`]: fixture-backed client for tests and demos
//! - [`RetryingClient`]: retries transient failures of any client

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

mod error;
pub mod memory;
pub mod model;
mod retrying;

pub use error::{ClientError, Result};
pub use memory::InMemoryClient;
pub use model::{
    Approver, GitlabMergeRequest, GitlabProject, GitlabUser, MergeRequestApprovals, UserRef,
};
pub use retrying::RetryingClient;

/// Paginated collections exposed by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Users,
    Projects,
    MergeRequests,
}

impl ResourceKind {
    /// API path segment of the collection.
    pub fn path(&self) -> &'static str {
        match self {
            ResourceKind::Users => "users",
            ResourceKind::Projects => "projects",
            ResourceKind::MergeRequests => "merge_requests",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Sub-resources addressed by a parent id and a resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailKind {
    /// `projects/:project_id/merge_requests/:merge_request_iid/approvals`
    MergeRequestApprovals,
}

impl DetailKind {
    pub fn path(&self, parent_id: u64, resource_id: u64) -> String {
        match self {
            DetailKind::MergeRequestApprovals => {
                format!("projects/{parent_id}/merge_requests/{resource_id}/approvals")
            }
        }
    }
}

/// One page of a collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Page number to request next, `None` on the last page
    pub next_page: Option<u32>,
}

/// Raw access to the remote platform.
///
/// Implementations must be thread-safe: a step may issue several detail
/// requests concurrently.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Returns the user the client is authenticated as.
    async fn get_account(&self) -> Result<Value>;

    /// Fetches one page (1-indexed) of a collection.
    async fn fetch_page(&self, kind: ResourceKind, page: u32) -> Result<Page>;

    /// Fetches a sub-resource. `Ok(None)` and [`ClientError::NotFound`] both
    /// mean there is nothing to report.
    async fn fetch_detail(
        &self,
        kind: DetailKind,
        parent_id: u64,
        resource_id: u64,
    ) -> Result<Option<Value>>;
}

/// Typed conveniences over [`ResourceClient`].
#[async_trait]
pub trait ResourceClientExt: ResourceClient {
    /// Streams every record of a collection, requesting pages as the stream
    /// is polled.
    fn fetch_collection(&self, kind: ResourceKind) -> BoxStream<'_, Result<Value>> {
        stream::try_unfold(Some(1u32), move |page| async move {
            let Some(page) = page else {
                return Ok(None);
            };
            let Page { items, next_page } = self.fetch_page(kind, page).await?;
            let records = stream::iter(items.into_iter().map(Ok::<Value, ClientError>));
            Ok::<_, ClientError>(Some((records, next_page)))
        })
        .try_flatten()
        .boxed()
    }

    /// Like [`ResourceClientExt::fetch_collection`], decoding each record.
    fn fetch_all<T>(&self, kind: ResourceKind) -> BoxStream<'_, Result<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.fetch_collection(kind)
            .and_then(move |raw| async move {
                serde_json::from_value(raw).map_err(|e| ClientError::decode(kind.path(), e))
            })
            .boxed()
    }

    async fn account(&self) -> Result<GitlabUser> {
        let raw = self.get_account().await?;
        serde_json::from_value(raw).map_err(|e| ClientError::decode("account", e))
    }

    /// Approval state of one merge request; `None` when the API has nothing.
    async fn fetch_merge_request_approvals(
        &self,
        project_id: u64,
        merge_request_id: u64,
    ) -> Result<Option<MergeRequestApprovals>> {
        let kind = DetailKind::MergeRequestApprovals;
        let raw = match self.fetch_detail(kind, project_id, merge_request_id).await {
            Ok(Some(Value::Null)) | Ok(None) => return Ok(None),
            Err(e) if e.is_not_found() => return Ok(None),
            Ok(Some(raw)) => raw,
            Err(e) => return Err(e),
        };

        serde_json::from_value(raw)
            .map(Some)
            .map_err(|e| ClientError::decode(kind.path(project_id, merge_request_id), e))
    }
}

impl<C: ResourceClient + ?Sized> ResourceClientExt for C {}
