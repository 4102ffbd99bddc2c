use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use ovino_core::{AnimalId, BatchId, DomainError, DomainResult, Entity, PregnancyId, Record};

/// Fixed ovine gestation length, in calendar days.
pub const GESTATION_DAYS: u64 = 150;

/// Projected due date: covering date plus the gestation offset.
///
/// Plain calendar arithmetic, no business-day or timezone adjustment.
pub fn due_date_for(covering_date: NaiveDate) -> DomainResult<NaiveDate> {
    covering_date
        .checked_add_days(Days::new(GESTATION_DAYS))
        .ok_or_else(|| DomainError::validation("covering date out of calendar range"))
}

/// Terminal state of a gestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PregnancyOutcome {
    Confirmed,
    Birth,
    Failure,
}

/// Durable record of a confirmed gestation.
///
/// Created exactly once per confirmed pregnancy, by the cycle flow. The
/// record outlives its batch (`origin_batch_id` only exists so a reversed
/// enrollment can find and delete it), and `due_date` is a pure function of
/// `covering_date`, never edited independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PregnancyRecord {
    pub id: PregnancyId,
    pub ewe_id: AnimalId,
    pub sire_id: Option<AnimalId>,
    pub covering_date: NaiveDate,
    pub due_date: NaiveDate,
    pub outcome: PregnancyOutcome,
    pub outcome_date: Option<NaiveDate>,
    pub origin_batch_id: Option<BatchId>,
}

impl PregnancyRecord {
    /// Confirm a gestation; the due date is derived here and nowhere else.
    pub fn confirm(
        ewe_id: AnimalId,
        sire_id: Option<AnimalId>,
        covering_date: NaiveDate,
        origin_batch_id: Option<BatchId>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: PregnancyId::new(),
            ewe_id,
            sire_id,
            covering_date,
            due_date: due_date_for(covering_date)?,
            outcome: PregnancyOutcome::Confirmed,
            outcome_date: None,
            origin_batch_id,
        })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.outcome, PregnancyOutcome::Confirmed)
    }

    /// Close the gestation with its terminal outcome.
    ///
    /// `Confirmed` is not a valid target: confirmation only happens at
    /// creation, through the cycle flow.
    pub fn record_outcome(
        &mut self,
        outcome: PregnancyOutcome,
        actual_date: Option<NaiveDate>,
    ) -> DomainResult<()> {
        match outcome {
            PregnancyOutcome::Confirmed => Err(DomainError::validation(
                "a pregnancy cannot be re-confirmed; outcome must be birth or failure",
            )),
            PregnancyOutcome::Birth | PregnancyOutcome::Failure => {
                if !self.is_confirmed() {
                    return Err(DomainError::conflict(format!(
                        "pregnancy already closed as {:?}",
                        self.outcome
                    )));
                }
                self.outcome = outcome;
                self.outcome_date = actual_date;
                Ok(())
            }
        }
    }
}

impl Entity for PregnancyRecord {
    type Id = PregnancyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PregnancyPatch {
    pub outcome: Option<PregnancyOutcome>,
    pub outcome_date: Option<NaiveDate>,
}

impl Record for PregnancyRecord {
    type Patch = PregnancyPatch;

    fn apply_patch(&mut self, patch: Self::Patch) {
        if let Some(outcome) = patch.outcome {
            self.outcome = outcome;
        }
        if let Some(outcome_date) = patch.outcome_date {
            self.outcome_date = Some(outcome_date);
        }
    }
}
