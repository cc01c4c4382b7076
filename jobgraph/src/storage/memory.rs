use super::{error::Result, error::StorageError, JobState, StoreIter};
use crate::core::{Entity, Relationship, RELATIONSHIP_KEY_DELIMITER};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// In-memory job state indexed by type.
///
/// Records of each type live in their own append-only bucket, and the buckets
/// are held in a DashMap so that readers and writers of different types do
/// not contend on a single lock. A separate key set gates writes: it is held
/// while a batch is checked for duplicates and appended, which makes every
/// `add_*` call all-or-nothing.
///
/// Iterators capture the bucket length when created and read items one at a
/// time, so they never hold a lock between calls to `next`.
pub struct InMemoryJobState {
    /// Every entity and relationship key added so far
    keys: Mutex<HashSet<String>>,
    /// Entities by type, in insertion order
    entities: DashMap<String, Arc<Bucket<Entity>>>,
    /// Entities by key
    entity_index: DashMap<String, Arc<Entity>>,
    /// Relationships by type, in insertion order
    relationships: DashMap<String, Arc<Bucket<Relationship>>>,
    entity_count: AtomicUsize,
    relationship_count: AtomicUsize,
    /// Side table for non-graph values
    data: DashMap<String, Value>,
}

impl InMemoryJobState {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashSet::new()),
            entities: DashMap::new(),
            entity_index: DashMap::new(),
            relationships: DashMap::new(),
            entity_count: AtomicUsize::new(0),
            relationship_count: AtomicUsize::new(0),
            data: DashMap::new(),
        }
    }

    /// Types that have at least one entity, in no particular order.
    pub fn entity_types(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.key().clone()).collect()
    }

    /// Types that have at least one relationship, in no particular order.
    pub fn relationship_types(&self) -> Vec<String> {
        self.relationships.iter().map(|e| e.key().clone()).collect()
    }

    fn lock_keys(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // Key set stays consistent even if a holder panicked: inserts happen
        // only after validation succeeds.
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryJobState {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobState for InMemoryJobState {
    async fn add_entities(&self, entities: Vec<Entity>) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut keys = self.lock_keys();
        check_unique(&keys, entities.iter().map(Entity::key))?;

        let added = entities.len();
        for entity in entities {
            keys.insert(entity.key().to_string());
            let entity = Arc::new(entity);
            self.entity_index
                .insert(entity.key().to_string(), Arc::clone(&entity));
            bucket_for(&self.entities, entity.entity_type()).push(entity);
        }
        self.entity_count.fetch_add(added, Ordering::SeqCst);

        Ok(())
    }

    async fn add_relationships(&self, relationships: Vec<Relationship>) -> Result<()> {
        if relationships.is_empty() {
            return Ok(());
        }

        for relationship in &relationships {
            validate_relationship(relationship)?;
        }

        let mut keys = self.lock_keys();
        check_unique(&keys, relationships.iter().map(Relationship::key))?;

        let added = relationships.len();
        for relationship in relationships {
            keys.insert(relationship.key().to_string());
            let relationship = Arc::new(relationship);
            bucket_for(&self.relationships, relationship.relationship_type()).push(relationship);
        }
        self.relationship_count.fetch_add(added, Ordering::SeqCst);

        Ok(())
    }

    fn iter_entities(&self, entity_type: &str) -> StoreIter<Entity> {
        iter_bucket(&self.entities, entity_type)
    }

    fn iter_relationships(&self, relationship_type: &str) -> StoreIter<Relationship> {
        iter_bucket(&self.relationships, relationship_type)
    }

    fn find_entity(&self, key: &str) -> Option<Arc<Entity>> {
        self.entity_index.get(key).map(|e| Arc::clone(e.value()))
    }

    fn has_key(&self, key: &str) -> bool {
        self.lock_keys().contains(key)
    }

    fn entity_count(&self) -> usize {
        self.entity_count.load(Ordering::SeqCst)
    }

    fn relationship_count(&self) -> usize {
        self.relationship_count.load(Ordering::SeqCst)
    }

    async fn set_data(&self, key: &str, value: Value) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    fn get_data(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|v| v.value().clone())
    }
}

/// Append-only list of records of one type.
struct Bucket<T> {
    items: RwLock<Vec<Arc<T>>>,
}

impl<T> Default for Bucket<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }
}

impl<T> Bucket<T> {
    fn push(&self, item: Arc<T>) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(item);
    }

    fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn get(&self, index: usize) -> Option<Arc<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }
}

/// Iterator over a bucket prefix fixed at creation time.
struct BucketIter<T> {
    bucket: Arc<Bucket<T>>,
    next: usize,
    end: usize,
}

impl<T> Iterator for BucketIter<T> {
    type Item = Arc<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let item = self.bucket.get(self.next);
        self.next += 1;
        item
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

fn bucket_for<T>(map: &DashMap<String, Arc<Bucket<T>>>, record_type: &str) -> Arc<Bucket<T>> {
    if let Some(bucket) = map.get(record_type) {
        return Arc::clone(bucket.value());
    }
    Arc::clone(map.entry(record_type.to_string()).or_default().value())
}

fn iter_bucket<T: Send + Sync + 'static>(
    map: &DashMap<String, Arc<Bucket<T>>>,
    record_type: &str,
) -> StoreIter<T> {
    // Clone the Arc so the DashMap shard guard is released before iterating
    let bucket = map.get(record_type).map(|b| Arc::clone(b.value()));
    match bucket {
        Some(bucket) => {
            let end = bucket.len();
            Box::new(BucketIter {
                bucket,
                next: 0,
                end,
            })
        }
        None => Box::new(std::iter::empty()),
    }
}

/// Rejects keys that exist already or repeat inside the incoming batch.
fn check_unique<'a>(
    existing: &HashSet<String>,
    incoming: impl Iterator<Item = &'a str>,
) -> Result<()> {
    let mut batch: HashSet<&str> = HashSet::new();
    for key in incoming {
        if existing.contains(key) || !batch.insert(key) {
            return Err(StorageError::duplicate_key(key));
        }
    }
    Ok(())
}

fn validate_relationship(relationship: &Relationship) -> Result<()> {
    let invalid = |reason: String| {
        Err(StorageError::invalid_relationship(
            relationship.key(),
            reason,
        ))
    };

    if relationship.class().trim().is_empty() {
        return invalid("class is empty".to_string());
    }
    for (side, key) in [
        ("from", relationship.from_key()),
        ("to", relationship.to_key()),
    ] {
        if key.is_empty() {
            return invalid(format!("{side} key is empty"));
        }
        if key.chars().any(char::is_whitespace) {
            return invalid(format!("{side} key '{key}' contains whitespace"));
        }
        if key.contains(RELATIONSHIP_KEY_DELIMITER) {
            return invalid(format!(
                "{side} key '{key}' contains '{RELATIONSHIP_KEY_DELIMITER}'"
            ));
        }
    }
    Ok(())
}
