use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use remex_domain::{ObjectId, StorableObject};
use tracing::debug;

use super::{CommitBatch, ObjectStore, StoreError};

/// Process-local store backed by a locked hash map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectId, StorableObject>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Sorted ids of every stored object.
    pub fn ids(&self) -> Result<Vec<ObjectId>, StoreError> {
        let objects = self.objects.read().map_err(poisoned)?;
        let mut ids: Vec<ObjectId> = objects.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

impl ObjectStore for MemoryStore {
    fn get(&self, id: &ObjectId) -> Result<StorableObject, StoreError> {
        let objects = self.objects.read().map_err(poisoned)?;
        objects
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound { id: *id })
    }

    fn set(&self, id: ObjectId, obj: StorableObject) -> Result<(), StoreError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        let replaced = objects.insert(id, obj).is_some();
        debug!(%id, replaced, "memory store set");
        Ok(())
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        let mut objects = self.objects.write().map_err(poisoned)?;
        for expected in batch.guards() {
            if objects.get(&expected.id) != Some(expected) {
                return Err(StoreError::Conflict { id: expected.id });
            }
        }
        let writes = batch.into_writes();
        let count = writes.len();
        for object in writes {
            objects.insert(object.id, object);
        }
        debug!(writes = count, "memory store commit");
        Ok(())
    }

    fn contains(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let objects = self.objects.read().map_err(poisoned)?;
        Ok(objects.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn missing_ids_report_not_found() {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        assert_eq!(store.get(&id), Err(StoreError::NotFound { id }));
        assert_eq!(store.contains(&id), Ok(false));
    }

    #[test]
    fn set_replaces_whole_object() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        store.set(id, StorableObject::new(id, 1_i64).with_description("first"))?;
        store.set(id, StorableObject::new(id, 2_i64))?;
        let stored = store.get(&id)?;
        assert_eq!(stored.data.as_int(), Some(2));
        assert!(stored.description.is_empty());
        assert_eq!(store.len()?, 1);
        Ok(())
    }

    #[test]
    fn commit_applies_every_write() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let target = StorableObject::new(ObjectId::new(), 1_i64);
        store.set(target.id, target.clone())?;
        let result = StorableObject::new(ObjectId::new(), "done");
        let updated = StorableObject::new(target.id, 2_i64);

        store.commit(
            CommitBatch::new()
                .guard(target)
                .write(updated.clone())
                .write(result.clone()),
        )?;

        assert_eq!(store.get(&updated.id)?, updated);
        assert_eq!(store.get(&result.id)?, result);
        Ok(())
    }

    #[test]
    fn stale_guard_writes_nothing() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let id = ObjectId::new();
        let stale = StorableObject::new(id, 1_i64);
        store.set(id, StorableObject::new(id, 5_i64))?;
        let result = StorableObject::new(ObjectId::new(), "lost");

        let err = store
            .commit(
                CommitBatch::new()
                    .guard(stale)
                    .write(StorableObject::new(id, 2_i64))
                    .write(result.clone()),
            )
            .expect_err("stale guard");

        assert_eq!(err, StoreError::Conflict { id });
        assert_eq!(err.code(), "RX409");
        assert_eq!(store.get(&id)?.data.as_int(), Some(5));
        assert!(!store.contains(&result.id)?);
        Ok(())
    }

    #[test]
    fn concurrent_writers_each_land() -> anyhow::Result<()> {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for value in 0..8_i64 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                let id = ObjectId::new();
                store.set(id, StorableObject::new(id, value)).map(|()| id)
            }));
        }
        for handle in handles {
            let id = handle.join().expect("thread join")?;
            assert!(store.contains(&id)?);
        }
        assert_eq!(store.len()?, 8);
        Ok(())
    }
}
