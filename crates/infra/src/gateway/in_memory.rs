use std::collections::HashMap;
use std::sync::RwLock;

use ovino_core::Record;

use super::collection::{Collection, StoreError};

/// In-memory collection.
///
/// Backs tests and the local fallback store. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryCollection<T: Record> {
    inner: RwLock<HashMap<T::Id, T>>,
}

impl<T: Record> InMemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Record> Default for InMemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl<T: Record> Collection<T> for InMemoryCollection<T> {
    fn list_all(&self) -> Result<Vec<T>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(id).cloned())
    }

    fn insert(&self, record: T) -> Result<T, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;

        if map.contains_key(record.id()) {
            return Err(StoreError::Conflict(format!(
                "record {:?} already exists",
                record.id()
            )));
        }
        if let Some(key) = record.unique_key() {
            if map.values().any(|r| r.unique_key().as_deref() == Some(&*key)) {
                return Err(StoreError::Conflict(format!(
                    "unique key {key:?} already taken"
                )));
            }
        }

        map.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn update_by_id(&self, id: &T::Id, patch: T::Patch) -> Result<T, StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;

        let mut updated = map.get(id).cloned().ok_or(StoreError::NotFound)?;
        updated.apply_patch(patch);

        if let Some(key) = updated.unique_key() {
            let taken = map
                .values()
                .any(|r| r.id() != id && r.unique_key().as_deref() == Some(&*key));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "unique key {key:?} already taken"
                )));
            }
        }

        map.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovino_herd::{Group, GroupPatch};

    #[test]
    fn insert_find_update_delete() {
        let groups = InMemoryCollection::<Group>::new();
        let group = groups.insert(Group::new("EM MONTA")).unwrap();

        assert_eq!(groups.find_by_id(&group.id).unwrap(), Some(group.clone()));
        assert_eq!(groups.list_all().unwrap().len(), 1);

        let renamed = groups
            .update_by_id(
                &group.id,
                GroupPatch {
                    name: Some("EM MONTA 2024".to_string()),
                },
            )
            .unwrap();
        assert_eq!(renamed.name, "EM MONTA 2024");

        groups.delete_by_id(&group.id).unwrap();
        assert!(matches!(
            groups.delete_by_id(&group.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn unique_key_collisions_conflict() {
        let groups = InMemoryCollection::<Group>::new();
        groups.insert(Group::new("VAZIAS")).unwrap();

        // Same key after trimming/casing.
        let err = groups.insert(Group::new("  vazias ")).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        // Renaming onto a taken key conflicts too.
        let other = groups.insert(Group::new("EM MONTA")).unwrap();
        let err = groups
            .update_by_id(
                &other.id,
                GroupPatch {
                    name: Some("Vazias".to_string()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn shared_across_threads() {
        let groups: std::sync::Arc<dyn Collection<Group>> =
            std::sync::Arc::new(InMemoryCollection::new());

        let writer = {
            let groups = groups.clone();
            std::thread::spawn(move || groups.insert(Group::new("EM MONTA")).unwrap())
        };
        let inserted = writer.join().unwrap();

        assert_eq!(groups.find_by_id(&inserted.id).unwrap(), Some(inserted));
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let groups = InMemoryCollection::<Group>::new();
        let ghost = Group::new("GHOST");
        assert!(matches!(
            groups.update_by_id(&ghost.id, GroupPatch::default()),
            Err(StoreError::NotFound)
        ));
    }
}
