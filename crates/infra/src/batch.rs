//! Batch lifecycle: creation, status flips, cascading deletion.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, instrument};

use ovino_breeding::{BatchPatch, BreedingBatch, EweEnrollment};
use ovino_core::{AnimalId, BatchId, DomainError};
use ovino_herd::Animal;

use crate::cycle::CycleService;
use crate::error::ServiceError;
use crate::gateway::{Collection, Gateway};

/// Result of a completed batch deletion cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    /// Every animal returned to awaiting-mating by the cascade.
    pub released: Vec<AnimalId>,
    /// Animals whose pregnancy-record cleanup failed during release; their
    /// removal itself succeeded (see `cycle::PregnancyCleanup`).
    pub cleanup_warnings: Vec<(AnimalId, String)>,
}

/// Creates and deletes breeding batches.
///
/// Deletion is the one compound operation: every enrolled ewe goes through
/// the cycle service's removal path before the batch record itself is
/// touched, so no animal is ever left categorized into a batch that no
/// longer exists.
#[derive(Clone)]
pub struct BatchManager {
    batches: Arc<dyn Collection<BreedingBatch>>,
    enrollments: Arc<dyn Collection<EweEnrollment>>,
    animals: Arc<dyn Collection<Animal>>,
    cycle: CycleService,
}

impl BatchManager {
    pub fn new(gateway: &Gateway, cycle: CycleService) -> Self {
        Self {
            batches: gateway.batches.clone(),
            enrollments: gateway.enrollments.clone(),
            animals: gateway.animals.clone(),
            cycle,
        }
    }

    #[instrument(skip(self, name), fields(name = %name.as_ref()))]
    pub fn create_batch(
        &self,
        name: impl AsRef<str>,
        sire_id: Option<AnimalId>,
        start_date: NaiveDate,
    ) -> Result<BreedingBatch, ServiceError> {
        let batch = BreedingBatch::new(name.as_ref(), sire_id, start_date)?;
        Ok(self.batches.insert(batch)?)
    }

    /// Freeze enrollment membership. Cycle results may still be recorded.
    pub fn close_batch(&self, batch_id: BatchId) -> Result<BreedingBatch, ServiceError> {
        self.flip_status(batch_id, BreedingBatch::close)
    }

    pub fn reopen_batch(&self, batch_id: BatchId) -> Result<BreedingBatch, ServiceError> {
        self.flip_status(batch_id, BreedingBatch::reopen)
    }

    fn flip_status(
        &self,
        batch_id: BatchId,
        flip: impl FnOnce(&mut BreedingBatch) -> ovino_core::DomainResult<()>,
    ) -> Result<BreedingBatch, ServiceError> {
        let mut batch = self
            .batches
            .find_by_id(&batch_id)?
            .ok_or(DomainError::NotFound)?;
        flip(&mut batch)?;
        Ok(self.batches.update_by_id(
            &batch_id,
            BatchPatch {
                name: None,
                status: Some(batch.status),
            },
        )?)
    }

    /// Delete a batch, releasing every enrolled ewe first.
    ///
    /// Each release is independent; a failure does not stop the rest, but
    /// any failure leaves the batch record in place and is reported with
    /// exactly which animals were released and which were not
    /// ([`ServiceError::CascadeFailed`]). A batch with no enrollments is a
    /// direct delete.
    #[instrument(skip(self), fields(batch_id = %batch_id))]
    pub fn delete_batch(&self, batch_id: BatchId) -> Result<CascadeReport, ServiceError> {
        let batch = self
            .batches
            .find_by_id(&batch_id)?
            .ok_or(DomainError::NotFound)?;

        let enrolled: Vec<EweEnrollment> = self
            .enrollments
            .list_all()?
            .into_iter()
            .filter(|e| e.batch_id == batch_id)
            .collect();

        let mut released = Vec::new();
        let mut cleanup_warnings = Vec::new();
        let mut failed = Vec::new();

        for enrollment in enrolled {
            match self.cycle.remove(batch_id, enrollment.id, enrollment.ewe_id) {
                Ok(report) => {
                    released.push(enrollment.ewe_id);
                    if let crate::cycle::PregnancyCleanup::Failed(reason) = report.cleanup {
                        cleanup_warnings.push((enrollment.ewe_id, reason));
                    }
                }
                Err(e) => failed.push((enrollment.ewe_id, e.to_string())),
            }
        }

        if !failed.is_empty() {
            return Err(ServiceError::CascadeFailed { released, failed });
        }

        self.batches.delete_by_id(&batch_id)?;
        info!(name = %batch.name, released = released.len(), "batch deleted");

        Ok(CascadeReport {
            released,
            cleanup_warnings,
        })
    }

    pub fn find_batch(&self, batch_id: BatchId) -> Result<Option<BreedingBatch>, ServiceError> {
        Ok(self.batches.find_by_id(&batch_id)?)
    }

    /// Ewes eligible for enrollment: not pregnant, not actively enrolled.
    ///
    /// The strict category gate is re-checked by `enroll` itself; this list
    /// is the coarse pool used to drive selection.
    pub fn enrollment_candidates(&self) -> Result<Vec<Animal>, ServiceError> {
        let mut active = std::collections::HashSet::new();
        for enrollment in self.enrollments.list_all()? {
            let open = self
                .batches
                .find_by_id(&enrollment.batch_id)?
                .is_some_and(|b| b.is_open());
            if open {
                active.insert(enrollment.ewe_id);
            }
        }

        Ok(self
            .animals
            .list_all()?
            .into_iter()
            .filter(|a| !a.is_pregnant && !active.contains(&a.id))
            .collect())
    }
}
