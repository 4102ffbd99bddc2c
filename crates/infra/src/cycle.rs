//! Ewe cycle orchestration: enrollment, result recording, removal.
//!
//! Each operation here is a sequence of independent gateway writes, not a
//! transaction. Writes are ordered so that a crash mid-operation leaves the
//! least damaging partial state (an orphan enrollment rather than a
//! miscategorized animal), and every operation is safe to re-invoke: replays
//! of already-applied steps are recognized and skipped instead of rejected.

use std::sync::Arc;

use tracing::{instrument, warn};

use ovino_auth::SecretVerifier;
use ovino_breeding::{BreedingBatch, Cycle, CycleResult, EweEnrollment, MatingOutcome, PregnancyRecord};
use ovino_core::{AnimalId, BatchId, DomainError, EnrollmentId, PregnancyId};
use ovino_herd::{Animal, AnimalPatch, HerdCategory};

use crate::error::ServiceError;
use crate::gateway::{Collection, Gateway, StoreError};
use crate::pregnancy::find_confirmed;
use crate::resolver::GroupResolver;

/// Outcome of the best-effort pregnancy-record cleanup during removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PregnancyCleanup {
    /// A confirmed record for this ewe + origin batch was deleted.
    Deleted(PregnancyId),
    /// No confirmed record existed (the common case).
    NoneFound,
    /// The cleanup step failed; the removal itself still stands, and the
    /// stale confirmed record must be retried or cleared manually.
    Failed(String),
}

/// What a removal actually did, step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    /// False when the enrollment record was already gone (a replayed call).
    pub enrollment_deleted: bool,
    pub cleanup: PregnancyCleanup,
}

impl RemovalReport {
    pub fn is_clean(&self) -> bool {
        !matches!(self.cleanup, PregnancyCleanup::Failed(_))
    }
}

/// The cycle state machine's service wrapper.
///
/// Owns the cross-record choreography of one business action: membership
/// record, herd categorization, pregnancy record and the ewe's flag move
/// together here, in a fixed order.
#[derive(Clone)]
pub struct CycleService {
    batches: Arc<dyn Collection<BreedingBatch>>,
    enrollments: Arc<dyn Collection<EweEnrollment>>,
    pregnancies: Arc<dyn Collection<PregnancyRecord>>,
    animals: Arc<dyn Collection<Animal>>,
    resolver: GroupResolver,
    secrets: Arc<dyn SecretVerifier>,
}

impl CycleService {
    pub fn new(gateway: &Gateway, secrets: Arc<dyn SecretVerifier>) -> Self {
        Self {
            batches: gateway.batches.clone(),
            enrollments: gateway.enrollments.clone(),
            pregnancies: gateway.pregnancies.clone(),
            animals: gateway.animals.clone(),
            resolver: GroupResolver::new(gateway),
            secrets,
        }
    }

    /// Enroll a candidate ewe into an open batch.
    ///
    /// Preconditions (checked before any write): the batch is open, the ewe
    /// exists, is not pregnant, holds no active enrollment in any open batch,
    /// and is not parked in some other category (strict gate: uncategorized
    /// or awaiting-mating only).
    ///
    /// Effects: insert the enrollment first, then move the ewe into the
    /// in-mating category. The enrollment record is the anchor a retry can
    /// find, so it goes in before the categorization flips.
    #[instrument(skip(self), fields(batch_id = %batch_id, ewe_id = %ewe_id))]
    pub fn enroll(
        &self,
        batch_id: BatchId,
        ewe_id: AnimalId,
    ) -> Result<EweEnrollment, ServiceError> {
        let batch = self
            .batches
            .find_by_id(&batch_id)?
            .ok_or(DomainError::NotFound)?;
        if !batch.is_open() {
            return Err(DomainError::invariant("cannot enroll into a closed batch").into());
        }

        let ewe = self
            .animals
            .find_by_id(&ewe_id)?
            .ok_or(DomainError::NotFound)?;

        // Replayed call: the enrollment already exists for this batch, so
        // finish the second half (categorization) and hand it back.
        if let Some(existing) = self.find_enrollment(batch_id, ewe_id)? {
            self.move_to_category(ewe_id, HerdCategory::InMating)?;
            return Ok(existing);
        }

        for other in self.enrollments.list_all()? {
            if other.ewe_id != ewe_id {
                continue;
            }
            let still_open = self
                .batches
                .find_by_id(&other.batch_id)?
                .is_some_and(|b| b.is_open());
            if still_open {
                return Err(DomainError::conflict(format!(
                    "ewe {ewe_id} is already enrolled in open batch {}",
                    other.batch_id
                ))
                .into());
            }
        }

        if ewe.is_pregnant {
            return Err(DomainError::validation(format!(
                "ewe {ewe_id} is already pregnant and not a mating candidate"
            ))
            .into());
        }

        // Strict candidate gate: an animal parked in any category other than
        // awaiting-mating is not in the eligible pool.
        let awaiting = self.resolver.resolve(HerdCategory::AwaitingMating)?;
        if let Some(group_id) = ewe.group_id {
            if group_id != awaiting.id {
                return Err(DomainError::validation(format!(
                    "ewe {ewe_id} is not in the awaiting-mating category"
                ))
                .into());
            }
        }

        let enrollment = self
            .enrollments
            .insert(EweEnrollment::new(batch_id, ewe_id))?;
        self.move_to_category(ewe_id, HerdCategory::InMating)?;
        Ok(enrollment)
    }

    /// Record a cycle result through the normal flow.
    ///
    /// `Empty` below cycle 3 advances the attempt; `Empty` at cycle 3
    /// finalizes with no pregnancy record; `Pregnant` finalizes, creates the
    /// single confirmed pregnancy record (covering date = batch start date)
    /// and flags the ewe pregnant. Re-recording the result a cycle already
    /// holds is treated as a replay: no state transition, but the pregnancy
    /// side effects are re-asserted so a half-applied call can be retried.
    #[instrument(skip(self), fields(batch_id = %batch_id, ewe_id = %ewe_id, cycle = %cycle))]
    pub fn record_result(
        &self,
        batch_id: BatchId,
        ewe_id: AnimalId,
        cycle: Cycle,
        outcome: MatingOutcome,
    ) -> Result<EweEnrollment, ServiceError> {
        let batch = self
            .batches
            .find_by_id(&batch_id)?
            .ok_or(DomainError::NotFound)?;
        let mut enrollment = self
            .find_enrollment(batch_id, ewe_id)?
            .ok_or(DomainError::NotFound)?;

        let replay = enrollment.cycle_result(cycle) == CycleResult::from(outcome);
        if !replay {
            enrollment.record_result(cycle, outcome)?;
            enrollment = self
                .enrollments
                .update_by_id(&enrollment.id, enrollment.state_patch())?;
        }

        if let MatingOutcome::Pregnant = outcome {
            self.confirm_pregnancy(&batch, ewe_id)?;
        }

        Ok(enrollment)
    }

    /// Manager override: edit a cycle result on a finalized enrollment.
    ///
    /// The secret is verified before anything is read or written; a wrong
    /// secret mutates nothing. The correction force-sets the cycle, resets
    /// later cycles, and reconciles the pregnancy side effects in whichever
    /// direction the record moved.
    #[instrument(skip(self, secret), fields(batch_id = %batch_id, ewe_id = %ewe_id, cycle = %cycle))]
    pub fn override_result(
        &self,
        batch_id: BatchId,
        ewe_id: AnimalId,
        cycle: Cycle,
        outcome: MatingOutcome,
        secret: &str,
    ) -> Result<EweEnrollment, ServiceError> {
        if !self.secrets.verify(secret) {
            return Err(DomainError::Unauthorized.into());
        }

        let batch = self
            .batches
            .find_by_id(&batch_id)?
            .ok_or(DomainError::NotFound)?;
        let mut enrollment = self
            .find_enrollment(batch_id, ewe_id)?
            .ok_or(DomainError::NotFound)?;

        enrollment.force_set(cycle, outcome)?;
        let enrollment = self
            .enrollments
            .update_by_id(&enrollment.id, enrollment.state_patch())?;

        if enrollment.has_pregnant_cycle() {
            self.confirm_pregnancy(&batch, ewe_id)?;
        } else {
            if let Some(record) = find_confirmed(&*self.pregnancies, ewe_id, batch_id)? {
                self.pregnancies.delete_by_id(&record.id)?;
            }
            self.animals
                .update_by_id(&ewe_id, AnimalPatch::pregnant(false))?;
        }

        Ok(enrollment)
    }

    /// Remove an enrollment and reverse its side effects.
    ///
    /// Ordered effects: (a) delete the membership record (already-gone is
    /// tolerated so the call can be replayed); (b) return the ewe to
    /// awaiting-mating and clear its pregnancy flag unconditionally; (c)
    /// best-effort deletion of the confirmed pregnancy record from this
    /// batch. A failure in (c) never rolls back (a)/(b): the animal's
    /// physical state is the higher-priority truth, and the stale record is
    /// surfaced through the report and a warning instead.
    #[instrument(skip(self), fields(batch_id = %batch_id, ewe_id = %ewe_id))]
    pub fn remove(
        &self,
        batch_id: BatchId,
        enrollment_id: EnrollmentId,
        ewe_id: AnimalId,
    ) -> Result<RemovalReport, ServiceError> {
        let enrollment_deleted = match self.enrollments.delete_by_id(&enrollment_id) {
            Ok(()) => true,
            Err(StoreError::NotFound) => false,
            Err(e) => return Err(e.into()),
        };

        self.move_to_category_and_reset(ewe_id, HerdCategory::AwaitingMating)?;

        let cleanup = match find_confirmed(&*self.pregnancies, ewe_id, batch_id) {
            Ok(Some(record)) => match self.pregnancies.delete_by_id(&record.id) {
                Ok(()) => PregnancyCleanup::Deleted(record.id),
                Err(e) => PregnancyCleanup::Failed(e.to_string()),
            },
            Ok(None) => PregnancyCleanup::NoneFound,
            Err(e) => PregnancyCleanup::Failed(e.to_string()),
        };
        if let PregnancyCleanup::Failed(reason) = &cleanup {
            warn!(
                %ewe_id,
                %batch_id,
                reason,
                "enrollment removed but confirmed pregnancy record not cleaned up"
            );
        }

        Ok(RemovalReport {
            enrollment_deleted,
            cleanup,
        })
    }

    /// The enrollment of a ewe within one batch, if present.
    pub fn find_enrollment(
        &self,
        batch_id: BatchId,
        ewe_id: AnimalId,
    ) -> Result<Option<EweEnrollment>, ServiceError> {
        Ok(self
            .enrollments
            .list_all()?
            .into_iter()
            .find(|e| e.batch_id == batch_id && e.ewe_id == ewe_id))
    }

    /// Idempotent creation of the confirmed record + pregnancy flag.
    fn confirm_pregnancy(
        &self,
        batch: &BreedingBatch,
        ewe_id: AnimalId,
    ) -> Result<(), ServiceError> {
        if find_confirmed(&*self.pregnancies, ewe_id, batch.id)?.is_none() {
            let record = PregnancyRecord::confirm(
                ewe_id,
                batch.sire_id,
                batch.start_date,
                Some(batch.id),
            )?;
            self.pregnancies.insert(record)?;
        }
        self.animals
            .update_by_id(&ewe_id, AnimalPatch::pregnant(true))?;
        Ok(())
    }

    fn move_to_category(
        &self,
        ewe_id: AnimalId,
        category: HerdCategory,
    ) -> Result<(), ServiceError> {
        let group = self.resolver.resolve(category)?;
        self.animals
            .update_by_id(&ewe_id, AnimalPatch::regroup(group.id))?;
        Ok(())
    }

    fn move_to_category_and_reset(
        &self,
        ewe_id: AnimalId,
        category: HerdCategory,
    ) -> Result<(), ServiceError> {
        let group = self.resolver.resolve(category)?;
        self.animals
            .update_by_id(&ewe_id, AnimalPatch::regroup_and_reset(group.id))?;
        Ok(())
    }
}
