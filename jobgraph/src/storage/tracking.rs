use super::{error::Result, JobState, StoreIter};
use crate::core::{Entity, Relationship};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// A per-step view of the job state.
///
/// Delegates everything to the shared store and records what the step
/// committed through it: the entity and relationship types it produced and
/// how many records of each kind it added. The executor compares the types
/// against the step's declared `produced_types` after the step finishes.
pub struct TypeTrackingJobState {
    inner: Arc<dyn JobState>,
    encountered: Mutex<BTreeSet<String>>,
    entities_added: AtomicUsize,
    relationships_added: AtomicUsize,
}

impl TypeTrackingJobState {
    pub fn new(inner: Arc<dyn JobState>) -> Self {
        Self {
            inner,
            encountered: Mutex::new(BTreeSet::new()),
            entities_added: AtomicUsize::new(0),
            relationships_added: AtomicUsize::new(0),
        }
    }

    /// Entity and relationship types committed through this view, sorted.
    pub fn encountered_types(&self) -> BTreeSet<String> {
        self.encountered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn entities_added(&self) -> usize {
        self.entities_added.load(Ordering::SeqCst)
    }

    pub fn relationships_added(&self) -> usize {
        self.relationships_added.load(Ordering::SeqCst)
    }

    fn record<'a>(&self, types: impl Iterator<Item = &'a str>) {
        let mut encountered = self
            .encountered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for t in types {
            if !encountered.contains(t) {
                encountered.insert(t.to_string());
            }
        }
    }
}

#[async_trait]
impl JobState for TypeTrackingJobState {
    async fn add_entities(&self, entities: Vec<Entity>) -> Result<()> {
        let types: BTreeSet<String> = entities
            .iter()
            .map(|e| e.entity_type().to_string())
            .collect();
        let count = entities.len();

        self.inner.add_entities(entities).await?;

        self.record(types.iter().map(String::as_str));
        self.entities_added.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }

    async fn add_relationships(&self, relationships: Vec<Relationship>) -> Result<()> {
        let types: BTreeSet<String> = relationships
            .iter()
            .map(|r| r.relationship_type().to_string())
            .collect();
        let count = relationships.len();

        self.inner.add_relationships(relationships).await?;

        self.record(types.iter().map(String::as_str));
        self.relationships_added.fetch_add(count, Ordering::SeqCst);
        Ok(())
    }

    fn iter_entities(&self, entity_type: &str) -> StoreIter<Entity> {
        self.inner.iter_entities(entity_type)
    }

    fn iter_relationships(&self, relationship_type: &str) -> StoreIter<Relationship> {
        self.inner.iter_relationships(relationship_type)
    }

    fn find_entity(&self, key: &str) -> Option<Arc<Entity>> {
        self.inner.find_entity(key)
    }

    fn has_key(&self, key: &str) -> bool {
        self.inner.has_key(key)
    }

    fn entity_count(&self) -> usize {
        self.inner.entity_count()
    }

    fn relationship_count(&self) -> usize {
        self.inner.relationship_count()
    }

    async fn set_data(&self, key: &str, value: Value) -> Result<()> {
        self.inner.set_data(key, value).await
    }

    fn get_data(&self, key: &str) -> Option<Value> {
        self.inner.get_data(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryJobState;

    #[tokio::test]
    async fn test_records_types_and_counts() {
        let shared: Arc<dyn JobState> = Arc::new(InMemoryJobState::new());
        let view = TypeTrackingJobState::new(Arc::clone(&shared));

        view.add_entities(vec![
            Entity::new("gitlab-user:1", "gitlab_user", "User", "1"),
            Entity::new("gitlab-user:2", "gitlab_user", "User", "2"),
        ])
        .await
        .unwrap();
        view.add_relationship(Relationship::new(
            "APPROVED",
            "gitlab_user_approved_merge_request",
            "gitlab-user:1",
            "proj:5:mr:3",
        ))
        .await
        .unwrap();

        assert_eq!(view.entities_added(), 2);
        assert_eq!(view.relationships_added(), 1);
        assert_eq!(
            view.encountered_types().into_iter().collect::<Vec<_>>(),
            ["gitlab_user", "gitlab_user_approved_merge_request"]
        );
        // Writes land in the shared store
        assert_eq!(shared.entity_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_write_is_not_recorded() {
        let shared: Arc<dyn JobState> = Arc::new(InMemoryJobState::new());
        shared
            .add_entity(Entity::new("gitlab-user:1", "gitlab_user", "User", "1"))
            .await
            .unwrap();

        let view = TypeTrackingJobState::new(shared);
        let result = view
            .add_entity(Entity::new("gitlab-user:1", "gitlab_user", "User", "1"))
            .await;

        assert!(result.is_err());
        assert_eq!(view.entities_added(), 0);
        assert!(view.encountered_types().is_empty());
    }
}
