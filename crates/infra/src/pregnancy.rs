//! Pregnancy record service.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use ovino_breeding::{PregnancyOutcome, PregnancyPatch, PregnancyRecord};
use ovino_core::{AnimalId, BatchId, DomainError, PregnancyId};
use ovino_herd::{Animal, AnimalPatch};

use crate::error::ServiceError;
use crate::gateway::{Collection, Gateway, StoreError};

/// The confirmed record for a given ewe and origin batch, if any.
///
/// Shared with the cycle service, which uses it both as the duplicate guard
/// when recording a pregnant result and as the reversal lookup.
pub fn find_confirmed(
    pregnancies: &dyn Collection<PregnancyRecord>,
    ewe_id: AnimalId,
    origin_batch_id: BatchId,
) -> Result<Option<PregnancyRecord>, StoreError> {
    Ok(pregnancies.list_all()?.into_iter().find(|record| {
        record.ewe_id == ewe_id
            && record.origin_batch_id == Some(origin_batch_id)
            && record.is_confirmed()
    }))
}

/// Manages confirmed-pregnancy records after their creation by the cycle
/// flow: terminal outcomes and reporting reads.
#[derive(Clone)]
pub struct PregnancyService {
    pregnancies: Arc<dyn Collection<PregnancyRecord>>,
    animals: Arc<dyn Collection<Animal>>,
}

impl PregnancyService {
    pub fn new(gateway: &Gateway) -> Self {
        Self {
            pregnancies: gateway.pregnancies.clone(),
            animals: gateway.animals.clone(),
        }
    }

    /// Close a gestation with `Birth` or `Failure`.
    ///
    /// Either way the gestation is over, so the ewe's pregnancy flag is
    /// cleared as a side effect. `Confirmed` is rejected before any write;
    /// confirmation only ever happens through the cycle flow.
    #[instrument(skip(self), fields(pregnancy_id = %id))]
    pub fn record_outcome(
        &self,
        id: PregnancyId,
        outcome: PregnancyOutcome,
        actual_date: Option<NaiveDate>,
    ) -> Result<PregnancyRecord, ServiceError> {
        let mut record = self
            .pregnancies
            .find_by_id(&id)?
            .ok_or(DomainError::NotFound)?;

        record.record_outcome(outcome, actual_date)?;

        let stored = self.pregnancies.update_by_id(
            &id,
            PregnancyPatch {
                outcome: Some(record.outcome),
                outcome_date: record.outcome_date,
            },
        )?;

        self.animals
            .update_by_id(&record.ewe_id, AnimalPatch::pregnant(false))?;

        Ok(stored)
    }

    pub fn find_confirmed_by_ewe_and_origin(
        &self,
        ewe_id: AnimalId,
        origin_batch_id: BatchId,
    ) -> Result<Option<PregnancyRecord>, ServiceError> {
        Ok(find_confirmed(&*self.pregnancies, ewe_id, origin_batch_id)?)
    }

    /// Open gestations, for due-date reporting consumers.
    pub fn list_confirmed(&self) -> Result<Vec<PregnancyRecord>, ServiceError> {
        Ok(self
            .pregnancies
            .list_all()?
            .into_iter()
            .filter(PregnancyRecord::is_confirmed)
            .collect())
    }
}
