//! Job state: the run-scoped graph store shared by all steps.
//!
//! Steps write entities and relationships here and read what earlier steps
//! produced, so nothing is fetched twice. The store is append-only for the
//! duration of a run and is handed to steps explicitly; there is no global.
//!
//! - [`InMemoryJobState`]: the in-process store, indexed by type
//! - [`TypeTrackingJobState`]: per-step view recording the types a step wrote
//!
//! # Example
//!
//! ```
//! use jobgraph::core::Entity;
//! use jobgraph::storage::{InMemoryJobState, JobState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = InMemoryJobState::new();
//! state
//!     .add_entities(vec![Entity::new("gitlab-user:7", "gitlab_user", "User", "7")])
//!     .await?;
//!
//! let users: Vec<_> = state.iter_entities("gitlab_user").collect();
//! assert_eq!(users.len(), 1);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::core::{Entity, Relationship};

mod error;
pub mod memory;
mod tracking;

pub use error::{Result, StorageError};
pub use memory::InMemoryJobState;
pub use tracking::TypeTrackingJobState;

/// Lazy, insertion-ordered iterator over stored records.
///
/// Bounded by the records committed when the iterator was created.
pub type StoreIter<T> = Box<dyn Iterator<Item = Arc<T>> + Send>;

/// Trait for job state backends.
///
/// Implementations must be safe for concurrent callers: steps may add
/// relationships from several in-flight tasks at once.
#[async_trait]
pub trait JobState: Send + Sync {
    /// Appends entities.
    ///
    /// Fails with [`StorageError::DuplicateKey`] if any key already exists or
    /// repeats within the batch; nothing is added in that case.
    async fn add_entities(&self, entities: Vec<Entity>) -> Result<()>;

    /// Appends relationships.
    ///
    /// Endpoints do not need to resolve at add time. Fails with
    /// [`StorageError::InvalidRelationship`] for empty or malformed endpoints
    /// and [`StorageError::DuplicateKey`] for repeated keys; nothing is added
    /// in either case.
    async fn add_relationships(&self, relationships: Vec<Relationship>) -> Result<()>;

    /// Iterates entities of one type in the order they were added.
    fn iter_entities(&self, entity_type: &str) -> StoreIter<Entity>;

    /// Iterates relationships of one type in the order they were added.
    fn iter_relationships(&self, relationship_type: &str) -> StoreIter<Relationship>;

    /// Looks up an entity by key.
    fn find_entity(&self, key: &str) -> Option<Arc<Entity>>;

    /// Returns true if an entity or relationship with this key exists.
    fn has_key(&self, key: &str) -> bool;

    fn entity_count(&self) -> usize;

    fn relationship_count(&self) -> usize;

    /// Stores a non-graph value for later steps, replacing any previous value.
    async fn set_data(&self, key: &str, value: Value) -> Result<()>;

    fn get_data(&self, key: &str) -> Option<Value>;

    async fn add_entity(&self, entity: Entity) -> Result<()> {
        self.add_entities(vec![entity]).await
    }

    async fn add_relationship(&self, relationship: Relationship) -> Result<()> {
        self.add_relationships(vec![relationship]).await
    }
}
