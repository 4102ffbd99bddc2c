use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use ovino_core::{AnimalId, BatchId, DomainError, DomainResult, Entity, Record};

/// Batch status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Open,
    Closed,
}

/// A mating season/event: one sire, a start date, and the enrolled ewes.
///
/// Enrollments are stored as their own records keyed by `batch_id`; the batch
/// itself only carries identity, the sire reference and its open/closed
/// status. `start_date` feeds due-date math for every pregnancy confirmed out
/// of this batch, so it is never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedingBatch {
    pub id: BatchId,
    pub name: String,
    pub sire_id: Option<AnimalId>,
    pub start_date: NaiveDate,
    pub status: BatchStatus,
}

impl BreedingBatch {
    /// Create an open batch.
    ///
    /// The only validation is a non-empty name; duplicate names are allowed
    /// (batches are operationally scoped by time, not uniqueness).
    pub fn new(
        name: impl Into<String>,
        sire_id: Option<AnimalId>,
        start_date: NaiveDate,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("batch name must not be empty"));
        }

        Ok(Self {
            id: BatchId::new(),
            name,
            sire_id,
            start_date,
            status: BatchStatus::Open,
        })
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, BatchStatus::Open)
    }

    pub fn close(&mut self) -> DomainResult<()> {
        if !self.is_open() {
            return Err(DomainError::conflict("batch is already closed"));
        }
        self.status = BatchStatus::Closed;
        Ok(())
    }

    pub fn reopen(&mut self) -> DomainResult<()> {
        if self.is_open() {
            return Err(DomainError::conflict("batch is already open"));
        }
        self.status = BatchStatus::Open;
        Ok(())
    }
}

impl Entity for BreedingBatch {
    type Id = BatchId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPatch {
    pub name: Option<String>,
    pub status: Option<BatchStatus>,
}

impl Record for BreedingBatch {
    type Patch = BatchPatch;

    fn apply_patch(&mut self, patch: Self::Patch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}
