//! Find-or-create resolution of the well-known herd categories.

use std::sync::Arc;

use tracing::{debug, instrument};

use ovino_herd::{Group, HerdCategory};

use crate::error::ServiceError;
use crate::gateway::{Collection, Gateway, StoreError};

/// Resolves the two categories the breeding flow moves animals between,
/// creating them lazily on first use. Never deletes a group.
#[derive(Clone)]
pub struct GroupResolver {
    groups: Arc<dyn Collection<Group>>,
}

impl GroupResolver {
    pub fn new(gateway: &Gateway) -> Self {
        Self {
            groups: gateway.groups.clone(),
        }
    }

    /// Idempotent lookup: alias match first, create on miss.
    ///
    /// Creation races with concurrent resolvers; the storage-level uniqueness
    /// constraint on the group name turns the loser's insert into a
    /// `Conflict`, handled here by re-fetching the winner.
    #[instrument(skip(self), fields(category = %category))]
    pub fn resolve(&self, category: HerdCategory) -> Result<Group, ServiceError> {
        if let Some(existing) = self.find(category)? {
            return Ok(existing);
        }

        match self.groups.insert(Group::new(category.canonical_name())) {
            Ok(created) => {
                debug!(group_id = %created.id, "created herd category");
                Ok(created)
            }
            Err(StoreError::Conflict(_)) => self
                .find(category)?
                .ok_or_else(|| StoreError::NotFound.into()),
            Err(e) => Err(e.into()),
        }
    }

    fn find(&self, category: HerdCategory) -> Result<Option<Group>, StoreError> {
        Ok(self
            .groups
            .list_all()?
            .into_iter()
            .find(|group| category.matches(&group.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryCollection;

    fn resolver_with(groups: Arc<dyn Collection<Group>>) -> GroupResolver {
        GroupResolver { groups }
    }

    #[test]
    fn creates_category_once() {
        let gateway = Gateway::in_memory();
        let resolver = GroupResolver::new(&gateway);

        let first = resolver.resolve(HerdCategory::InMating).unwrap();
        let second = resolver.resolve(HerdCategory::InMating).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "EM MONTA");
        assert_eq!(gateway.groups.list_all().unwrap().len(), 1);
    }

    #[test]
    fn reuses_alias_spellings() {
        let gateway = Gateway::in_memory();
        let seeded = gateway
            .groups
            .insert(Group::new("Matrizes Vazias"))
            .unwrap();

        let resolver = GroupResolver::new(&gateway);
        let resolved = resolver.resolve(HerdCategory::AwaitingMating).unwrap();

        assert_eq!(resolved.id, seeded.id);
        assert_eq!(gateway.groups.list_all().unwrap().len(), 1);
    }

    /// Double simulating a lost find-or-create race: the first read misses,
    /// the insert conflicts, and the re-fetch sees the winner.
    struct RacingGroups {
        inner: InMemoryCollection<Group>,
        winner: Group,
        reads: std::sync::atomic::AtomicUsize,
    }

    impl Collection<Group> for RacingGroups {
        fn list_all(&self) -> Result<Vec<Group>, StoreError> {
            let read = self
                .reads
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if read == 0 {
                return Ok(vec![]);
            }
            Ok(vec![self.winner.clone()])
        }

        fn find_by_id(&self, id: &ovino_core::GroupId) -> Result<Option<Group>, StoreError> {
            self.inner.find_by_id(id)
        }

        fn insert(&self, _record: Group) -> Result<Group, StoreError> {
            Err(StoreError::Conflict("unique key taken".to_string()))
        }

        fn update_by_id(
            &self,
            id: &ovino_core::GroupId,
            patch: ovino_herd::GroupPatch,
        ) -> Result<Group, StoreError> {
            self.inner.update_by_id(id, patch)
        }

        fn delete_by_id(&self, id: &ovino_core::GroupId) -> Result<(), StoreError> {
            self.inner.delete_by_id(id)
        }
    }

    #[test]
    fn lost_creation_race_uses_winner() {
        let winner = Group::new("EM MONTA");
        let resolver = resolver_with(Arc::new(RacingGroups {
            inner: InMemoryCollection::new(),
            winner: winner.clone(),
            reads: std::sync::atomic::AtomicUsize::new(0),
        }));

        let resolved = resolver.resolve(HerdCategory::InMating).unwrap();
        assert_eq!(resolved.id, winner.id);
    }
}
