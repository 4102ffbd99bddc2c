//! Integration tests for the full breeding flow.
//!
//! Tests: enrollment → cycle recording → pregnancy confirmation → removal /
//! cascade deletion, over the in-memory gateway.
//!
//! Verifies:
//! - Enrollment exclusivity and the strict candidate gate
//! - Finalization and single-pregnancy-record idempotence
//! - Reversal completeness, including a failing cleanup collaborator
//! - Cascade deletion, including partial failure reporting

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use ovino_auth::FixedSecret;
    use ovino_breeding::{Cycle, CycleResult, MatingOutcome, PregnancyRecord};
    use ovino_core::{AnimalId, BatchId, DomainError};
    use ovino_herd::{Animal, AnimalPatch, Group};

    use crate::batch::BatchManager;
    use crate::cycle::{CycleService, PregnancyCleanup};
    use crate::error::ServiceError;
    use crate::gateway::{Collection, Gateway, InMemoryCollection, StoreError};

    const SECRET: &str = "m4nager";

    struct Farm {
        gateway: Gateway,
        cycle: CycleService,
        batches: BatchManager,
    }

    fn farm() -> Farm {
        ovino_observability::init();
        farm_with(Gateway::in_memory())
    }

    fn farm_with(gateway: Gateway) -> Farm {
        let cycle = CycleService::new(&gateway, Arc::new(FixedSecret::new(SECRET)));
        let batches = BatchManager::new(&gateway, cycle.clone());
        Farm {
            gateway,
            cycle,
            batches,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_ewe(farm: &Farm, name: &str) -> AnimalId {
        farm.gateway.animals.insert(Animal::new(name)).unwrap().id
    }

    fn animal(farm: &Farm, id: AnimalId) -> Animal {
        farm.gateway.animals.find_by_id(&id).unwrap().unwrap()
    }

    fn group_name(farm: &Farm, id: AnimalId) -> String {
        let group_id = animal(farm, id).group_id.expect("animal has no group");
        farm.gateway
            .groups
            .find_by_id(&group_id)
            .unwrap()
            .unwrap()
            .name
    }

    fn pregnancy_records(farm: &Farm) -> Vec<PregnancyRecord> {
        farm.gateway.pregnancies.list_all().unwrap()
    }

    fn spring24(farm: &Farm, sire: Option<AnimalId>) -> BatchId {
        farm.batches
            .create_batch("SPRING-24", sire, date(2024, 9, 1))
            .unwrap()
            .id
    }

    #[test]
    fn full_scenario_spring24() {
        let farm = farm();
        let sire = seed_ewe(&farm, "S1");
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, Some(sire));

        // Enrollment moves the ewe into EM MONTA.
        farm.cycle.enroll(batch, e1).unwrap();
        assert_eq!(group_name(&farm, e1), "EM MONTA");

        // Cycle 1 empty: attempt advances, nothing finalized.
        let enrollment = farm
            .cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Empty)
            .unwrap();
        assert_eq!(enrollment.attempt_count, 2);
        assert!(!enrollment.finalized);

        // Cycle 2 pregnant: finalized, one confirmed record, flag set.
        let enrollment = farm
            .cycle
            .record_result(batch, e1, Cycle::Second, MatingOutcome::Pregnant)
            .unwrap();
        assert!(enrollment.finalized);
        assert!(animal(&farm, e1).is_pregnant);

        let records = pregnancy_records(&farm);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].ewe_id, e1);
        assert_eq!(records[0].sire_id, Some(sire));
        assert_eq!(records[0].covering_date, date(2024, 9, 1));
        assert_eq!(records[0].due_date, date(2025, 1, 29));
        assert_eq!(records[0].origin_batch_id, Some(batch));

        // Removal reverses everything, in order.
        let report = farm.cycle.remove(batch, enrollment.id, e1).unwrap();
        assert!(report.enrollment_deleted);
        assert!(matches!(report.cleanup, PregnancyCleanup::Deleted(_)));
        assert_eq!(group_name(&farm, e1), "VAZIAS");
        assert!(!animal(&farm, e1).is_pregnant);
        assert!(pregnancy_records(&farm).is_empty());
        assert!(farm.cycle.find_enrollment(batch, e1).unwrap().is_none());
    }

    #[test]
    fn ewe_is_excluded_from_other_open_batches() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let first = spring24(&farm, None);
        let second = farm
            .batches
            .create_batch("AUTUMN-24", None, date(2024, 10, 1))
            .unwrap()
            .id;

        let enrollment = farm.cycle.enroll(first, e1).unwrap();
        let err = farm.cycle.enroll(second, e1).unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));

        // Once removed (and back in VAZIAS) the ewe is eligible again.
        farm.cycle.remove(first, enrollment.id, e1).unwrap();
        farm.cycle.enroll(second, e1).unwrap();
        assert_eq!(group_name(&farm, e1), "EM MONTA");
    }

    #[test]
    fn enroll_replay_returns_the_same_enrollment() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);

        let first = farm.cycle.enroll(batch, e1).unwrap();
        let second = farm.cycle.enroll(batch, e1).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(farm.gateway.enrollments.list_all().unwrap().len(), 1);
    }

    #[test]
    fn pregnant_or_foreign_category_ewes_are_not_candidates() {
        let farm = farm();
        let batch = spring24(&farm, None);

        let pregnant = seed_ewe(&farm, "P1");
        farm.gateway
            .animals
            .update_by_id(&pregnant, AnimalPatch::pregnant(true))
            .unwrap();
        let err = farm.cycle.enroll(batch, pregnant).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Validation(_))
        ));

        // Strict gate: an animal parked in an unrelated category is rejected.
        let lactating = farm.gateway.groups.insert(Group::new("LACTANTES")).unwrap();
        let parked = seed_ewe(&farm, "L1");
        farm.gateway
            .animals
            .update_by_id(&parked, AnimalPatch::regroup(lactating.id))
            .unwrap();
        let err = farm.cycle.enroll(batch, parked).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Validation(_))
        ));

        assert!(farm.gateway.enrollments.list_all().unwrap().is_empty());
    }

    #[test]
    fn closed_batches_reject_enrollment_but_accept_results() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let e2 = seed_ewe(&farm, "E2");
        let batch = spring24(&farm, None);

        farm.cycle.enroll(batch, e1).unwrap();
        farm.batches.close_batch(batch).unwrap();

        let err = farm.cycle.enroll(batch, e2).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvariantViolation(_))
        ));

        // Results still arrive after the mating window closes.
        let enrollment = farm
            .cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Empty)
            .unwrap();
        assert_eq!(enrollment.attempt_count, 2);
    }

    #[test]
    fn out_of_sequence_result_rejected_without_writes() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();

        let err = farm
            .cycle
            .record_result(batch, e1, Cycle::Second, MatingOutcome::Pregnant)
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::InvariantViolation(_))
        ));

        let enrollment = farm.cycle.find_enrollment(batch, e1).unwrap().unwrap();
        assert_eq!(enrollment.cycles, [CycleResult::Pending; 3]);
        assert!(pregnancy_records(&farm).is_empty());
    }

    #[test]
    fn recording_pregnant_twice_keeps_a_single_record() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();

        farm.cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Pregnant)
            .unwrap();
        // Retried call (e.g. the caller timed out and re-invoked).
        farm.cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Pregnant)
            .unwrap();

        assert_eq!(pregnancy_records(&farm).len(), 1);
        assert!(animal(&farm, e1).is_pregnant);
    }

    #[test]
    fn three_empty_cycles_finalize_without_a_record() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();

        for cycle in Cycle::ALL {
            farm.cycle
                .record_result(batch, e1, cycle, MatingOutcome::Empty)
                .unwrap();
        }

        let enrollment = farm.cycle.find_enrollment(batch, e1).unwrap().unwrap();
        assert!(enrollment.finalized);
        assert!(pregnancy_records(&farm).is_empty());
        assert!(!animal(&farm, e1).is_pregnant);
    }

    #[test]
    fn override_with_wrong_secret_mutates_nothing() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();
        farm.cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Pregnant)
            .unwrap();

        let err = farm
            .cycle
            .override_result(batch, e1, Cycle::First, MatingOutcome::Empty, "wrong")
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Unauthorized)));

        let enrollment = farm.cycle.find_enrollment(batch, e1).unwrap().unwrap();
        assert_eq!(enrollment.cycle_result(Cycle::First), CycleResult::Pregnant);
        assert_eq!(pregnancy_records(&farm).len(), 1);
        assert!(animal(&farm, e1).is_pregnant);
    }

    #[test]
    fn override_reverses_a_confirmed_pregnancy() {
        let farm = farm();
        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();
        farm.cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Empty)
            .unwrap();
        farm.cycle
            .record_result(batch, e1, Cycle::Second, MatingOutcome::Pregnant)
            .unwrap();

        let enrollment = farm
            .cycle
            .override_result(batch, e1, Cycle::Second, MatingOutcome::Empty, SECRET)
            .unwrap();
        assert!(!enrollment.finalized);
        assert_eq!(enrollment.attempt_count, 3);
        assert!(pregnancy_records(&farm).is_empty());
        assert!(!animal(&farm, e1).is_pregnant);

        // The normal flow picks up where the correction left off.
        let enrollment = farm
            .cycle
            .record_result(batch, e1, Cycle::Third, MatingOutcome::Empty)
            .unwrap();
        assert!(enrollment.finalized);
    }

    /// Pregnancy collection whose deletes always fail, to exercise the
    /// best-effort cleanup path of removal.
    struct DeleteAlwaysFails {
        inner: InMemoryCollection<PregnancyRecord>,
    }

    impl Collection<PregnancyRecord> for DeleteAlwaysFails {
        fn list_all(&self) -> Result<Vec<PregnancyRecord>, StoreError> {
            self.inner.list_all()
        }
        fn find_by_id(
            &self,
            id: &ovino_core::PregnancyId,
        ) -> Result<Option<PregnancyRecord>, StoreError> {
            self.inner.find_by_id(id)
        }
        fn insert(&self, record: PregnancyRecord) -> Result<PregnancyRecord, StoreError> {
            self.inner.insert(record)
        }
        fn update_by_id(
            &self,
            id: &ovino_core::PregnancyId,
            patch: ovino_breeding::PregnancyPatch,
        ) -> Result<PregnancyRecord, StoreError> {
            self.inner.update_by_id(id, patch)
        }
        fn delete_by_id(&self, _id: &ovino_core::PregnancyId) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("pregnancy store offline".to_string()))
        }
    }

    #[test]
    fn removal_stands_even_when_cleanup_fails() {
        let mut gateway = Gateway::in_memory();
        gateway.pregnancies = Arc::new(DeleteAlwaysFails {
            inner: InMemoryCollection::new(),
        });
        let farm = farm_with(gateway);

        let e1 = seed_ewe(&farm, "E1");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();
        farm.cycle
            .record_result(batch, e1, Cycle::First, MatingOutcome::Pregnant)
            .unwrap();
        let enrollment = farm.cycle.find_enrollment(batch, e1).unwrap().unwrap();

        let report = farm.cycle.remove(batch, enrollment.id, e1).unwrap();
        assert!(report.enrollment_deleted);
        assert!(matches!(report.cleanup, PregnancyCleanup::Failed(_)));
        assert!(!report.is_clean());

        // (a) and (b) stand regardless of (c).
        assert_eq!(group_name(&farm, e1), "VAZIAS");
        assert!(!animal(&farm, e1).is_pregnant);
        // The stale record is still there, surfaced, not hidden.
        assert_eq!(pregnancy_records(&farm).len(), 1);
    }

    #[test]
    fn cascade_delete_releases_every_ewe() {
        let farm = farm();
        let sire = seed_ewe(&farm, "S1");
        let ewes: Vec<AnimalId> = (1..=3).map(|i| seed_ewe(&farm, &format!("E{i}"))).collect();
        let batch = spring24(&farm, Some(sire));

        for ewe in &ewes {
            farm.cycle.enroll(batch, *ewe).unwrap();
        }
        farm.cycle
            .record_result(batch, ewes[0], Cycle::First, MatingOutcome::Pregnant)
            .unwrap();

        let report = farm.batches.delete_batch(batch).unwrap();
        assert_eq!(report.released.len(), 3);
        assert!(report.cleanup_warnings.is_empty());

        assert!(farm.gateway.batches.find_by_id(&batch).unwrap().is_none());
        assert!(farm.gateway.enrollments.list_all().unwrap().is_empty());
        assert!(pregnancy_records(&farm).is_empty());
        for ewe in ewes {
            assert_eq!(group_name(&farm, ewe), "VAZIAS");
            assert!(!animal(&farm, ewe).is_pregnant);
        }
    }

    /// Animal collection that refuses updates for one poisoned id.
    struct PoisonedAnimals {
        inner: InMemoryCollection<Animal>,
        poisoned: std::sync::Mutex<Option<AnimalId>>,
    }

    impl Collection<Animal> for PoisonedAnimals {
        fn list_all(&self) -> Result<Vec<Animal>, StoreError> {
            self.inner.list_all()
        }
        fn find_by_id(&self, id: &AnimalId) -> Result<Option<Animal>, StoreError> {
            self.inner.find_by_id(id)
        }
        fn insert(&self, record: Animal) -> Result<Animal, StoreError> {
            self.inner.insert(record)
        }
        fn update_by_id(
            &self,
            id: &AnimalId,
            patch: AnimalPatch,
        ) -> Result<Animal, StoreError> {
            if *self.poisoned.lock().unwrap() == Some(*id) {
                return Err(StoreError::Unavailable("animal registry offline".to_string()));
            }
            self.inner.update_by_id(id, patch)
        }
        fn delete_by_id(&self, id: &AnimalId) -> Result<(), StoreError> {
            self.inner.delete_by_id(id)
        }
    }

    #[test]
    fn cascade_partial_failure_keeps_the_batch_and_names_the_ewe() {
        let animals = Arc::new(PoisonedAnimals {
            inner: InMemoryCollection::new(),
            poisoned: std::sync::Mutex::new(None),
        });
        let mut gateway = Gateway::in_memory();
        gateway.animals = animals.clone();
        let farm = farm_with(gateway);

        let e1 = seed_ewe(&farm, "E1");
        let e2 = seed_ewe(&farm, "E2");
        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, e1).unwrap();
        farm.cycle.enroll(batch, e2).unwrap();

        *animals.poisoned.lock().unwrap() = Some(e2);

        let err = farm.batches.delete_batch(batch).unwrap_err();
        match err {
            ServiceError::CascadeFailed { released, failed } => {
                assert_eq!(released, vec![e1]);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].0, e2);
            }
            other => panic!("expected CascadeFailed, got {other:?}"),
        }

        // The batch record survives a partial release.
        assert!(farm.gateway.batches.find_by_id(&batch).unwrap().is_some());
        assert_eq!(group_name(&farm, e1), "VAZIAS");
    }

    #[test]
    fn deleting_an_empty_batch_is_direct() {
        let farm = farm();
        let batch = spring24(&farm, None);
        let report = farm.batches.delete_batch(batch).unwrap();
        assert!(report.released.is_empty());
        assert!(farm.gateway.batches.find_by_id(&batch).unwrap().is_none());
    }

    #[test]
    fn candidates_exclude_enrolled_and_pregnant_ewes() {
        let farm = farm();
        let free = seed_ewe(&farm, "F1");
        let enrolled = seed_ewe(&farm, "E1");
        let pregnant = seed_ewe(&farm, "P1");
        farm.gateway
            .animals
            .update_by_id(&pregnant, AnimalPatch::pregnant(true))
            .unwrap();

        let batch = spring24(&farm, None);
        farm.cycle.enroll(batch, enrolled).unwrap();

        let candidates: Vec<AnimalId> = farm
            .batches
            .enrollment_candidates()
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert!(candidates.contains(&free));
        assert!(!candidates.contains(&enrolled));
        assert!(!candidates.contains(&pregnant));
    }
}
