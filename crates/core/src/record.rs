//! Record trait: what a persisted entity must offer the storage gateway.
//!
//! The gateway exposes generic per-collection CRUD (`list_all` / `insert` /
//! `update_by_id` / `delete_by_id`). Partial updates are expressed through a
//! typed `Patch` per record instead of loose field maps, so a caller can only
//! touch fields the domain allows to be touched.

use crate::entity::Entity;

/// A persistable domain record.
pub trait Record: Entity + Clone + Send + Sync + 'static {
    /// Partial-update shape for this record (each field optional).
    type Patch: Clone + Send + Sync + core::fmt::Debug;

    /// Apply a partial update in place.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Optional collection-wide uniqueness key.
    ///
    /// Storage backends must reject an insert whose `unique_key` collides with
    /// an existing record's, which is what makes find-or-create callers safe
    /// against the read-then-write race: the loser gets a conflict and
    /// re-fetches the winner.
    fn unique_key(&self) -> Option<String> {
        None
    }
}
