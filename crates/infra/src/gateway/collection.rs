use std::sync::Arc;

use thiserror::Error;

use ovino_core::Record;

/// Storage gateway operation error.
///
/// These are **infrastructure errors** (constraints, connectivity) as opposed
/// to domain errors (validation, invariants).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness or referential constraint rejected the write.
    #[error("constraint conflict: {0}")]
    Conflict(String),

    /// The addressed record does not exist.
    #[error("record not found")]
    NotFound,

    /// Transient/connectivity failure; the write may be retried.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record failed to (de)serialize against the storage format.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// One keyed collection of the persistence gateway.
///
/// The gateway exposes a handful of these (batches, enrollments, pregnancy
/// records, groups, animals), each with the same four operations plus a
/// point read. The storage medium behind a collection is opaque to callers;
/// the in-memory implementation backs tests and the local fallback store,
/// the Postgres implementation backs deployments.
///
/// Implementations must reject an `insert` whose [`Record::unique_key`]
/// collides with an existing record's, returning [`StoreError::Conflict`].
/// That constraint is what turns find-or-create callers' read-then-write
/// race into a benign "re-fetch the winner" path.
pub trait Collection<T: Record>: Send + Sync {
    fn list_all(&self) -> Result<Vec<T>, StoreError>;

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, StoreError>;

    /// Persist a new record, returning it as stored.
    fn insert(&self, record: T) -> Result<T, StoreError>;

    /// Apply a partial update, returning the record as stored afterwards.
    fn update_by_id(&self, id: &T::Id, patch: T::Patch) -> Result<T, StoreError>;

    /// Delete a record. Deleting an absent id reports [`StoreError::NotFound`];
    /// callers that tolerate replays handle that case explicitly.
    fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError>;
}

impl<T, C> Collection<T> for Arc<C>
where
    T: Record,
    C: Collection<T> + ?Sized,
{
    fn list_all(&self) -> Result<Vec<T>, StoreError> {
        (**self).list_all()
    }

    fn find_by_id(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        (**self).find_by_id(id)
    }

    fn insert(&self, record: T) -> Result<T, StoreError> {
        (**self).insert(record)
    }

    fn update_by_id(&self, id: &T::Id, patch: T::Patch) -> Result<T, StoreError> {
        (**self).update_by_id(id, patch)
    }

    fn delete_by_id(&self, id: &T::Id) -> Result<(), StoreError> {
        (**self).delete_by_id(id)
    }
}
