//! Per-ewe cycle state machine.
//!
//! An enrollment tracks up to three sequential mating attempts ("cycles") for
//! one ewe inside one batch. Cycle *n* becomes recordable only once every
//! lower-numbered cycle has resolved to `Empty`; a `Pregnant` result at any
//! cycle terminates the sequence. All transitions here are pure and
//! deterministic; side effects (category moves, pregnancy records) are
//! orchestrated by `ovino-infra`.

use serde::{Deserialize, Serialize};

use ovino_core::{AnimalId, BatchId, DomainError, DomainResult, Entity, EnrollmentId, Record};

/// Result slot of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleResult {
    Pending,
    Pregnant,
    Empty,
}

/// The recordable outcomes (`Pending` is a start state, never an input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatingOutcome {
    Pregnant,
    Empty,
}

impl From<MatingOutcome> for CycleResult {
    fn from(value: MatingOutcome) -> Self {
        match value {
            MatingOutcome::Pregnant => CycleResult::Pregnant,
            MatingOutcome::Empty => CycleResult::Empty,
        }
    }
}

/// One of the three addressable cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cycle {
    First,
    Second,
    Third,
}

impl Cycle {
    pub const ALL: [Cycle; 3] = [Cycle::First, Cycle::Second, Cycle::Third];

    pub fn number(self) -> u8 {
        match self {
            Cycle::First => 1,
            Cycle::Second => 2,
            Cycle::Third => 3,
        }
    }

    fn index(self) -> usize {
        (self.number() - 1) as usize
    }

    pub fn previous(self) -> Option<Cycle> {
        match self {
            Cycle::First => None,
            Cycle::Second => Some(Cycle::First),
            Cycle::Third => Some(Cycle::Second),
        }
    }
}

impl core::fmt::Display for Cycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "cycle {}", self.number())
    }
}

/// The batch-membership record for one ewe, carrying its cycle state.
///
/// # Invariants
/// - `finalized == true` iff `Pregnant` appears in any cycle or cycle 3 is
///   `Empty`.
/// - `attempt_count` starts at 1 and advances only on a non-terminal `Empty`.
/// - A cycle may be recorded only when the immediately preceding cycle (if
///   any) resolved to `Empty` and the enrollment is not finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EweEnrollment {
    pub id: EnrollmentId,
    pub batch_id: BatchId,
    pub ewe_id: AnimalId,
    pub attempt_count: u8,
    pub cycles: [CycleResult; 3],
    pub finalized: bool,
}

impl EweEnrollment {
    /// Fresh enrollment: attempt 1, all cycles pending.
    pub fn new(batch_id: BatchId, ewe_id: AnimalId) -> Self {
        Self {
            id: EnrollmentId::new(),
            batch_id,
            ewe_id,
            attempt_count: 1,
            cycles: [CycleResult::Pending; 3],
            finalized: false,
        }
    }

    pub fn cycle_result(&self, cycle: Cycle) -> CycleResult {
        self.cycles[cycle.index()]
    }

    pub fn has_pregnant_cycle(&self) -> bool {
        self.cycles.contains(&CycleResult::Pregnant)
    }

    /// Record the result of a cycle through the normal flow.
    ///
    /// Finalized enrollments are immutable here; corrections go through the
    /// manager-gated [`EweEnrollment::force_set`].
    pub fn record_result(&mut self, cycle: Cycle, outcome: MatingOutcome) -> DomainResult<()> {
        if self.finalized {
            return Err(DomainError::invariant(
                "enrollment is finalized; results can no longer be recorded",
            ));
        }
        if self.cycle_result(cycle) != CycleResult::Pending {
            return Err(DomainError::invariant(format!(
                "{cycle} already has a result"
            )));
        }
        if let Some(previous) = cycle.previous() {
            if self.cycle_result(previous) != CycleResult::Empty {
                return Err(DomainError::invariant(format!(
                    "{cycle} is not reachable until {previous} resolves to empty"
                )));
            }
        }

        self.cycles[cycle.index()] = outcome.into();
        self.recompute();
        Ok(())
    }

    /// Force a cycle result onto the enrollment, finalized or not.
    ///
    /// Used by the manager-override path only. Lower-numbered cycles must
    /// still all be `Empty` (otherwise the cycle could never have been live);
    /// later cycles are reset to `Pending` since the correction invalidates
    /// whatever was recorded after the edited cycle.
    pub fn force_set(&mut self, cycle: Cycle, outcome: MatingOutcome) -> DomainResult<()> {
        if let Some(previous) = cycle.previous() {
            if self.cycle_result(previous) != CycleResult::Empty {
                return Err(DomainError::invariant(format!(
                    "{cycle} was never reachable; correct {previous} first"
                )));
            }
        }

        self.cycles[cycle.index()] = outcome.into();
        for later in Cycle::ALL.iter().filter(|c| c.index() > cycle.index()) {
            self.cycles[later.index()] = CycleResult::Pending;
        }
        self.recompute();
        Ok(())
    }

    /// Re-derive `attempt_count` and `finalized` from the cycle array.
    fn recompute(&mut self) {
        let leading_empties = self
            .cycles
            .iter()
            .take_while(|r| **r == CycleResult::Empty)
            .count() as u8;
        self.attempt_count = (leading_empties + 1).min(3);
        self.finalized =
            self.has_pregnant_cycle() || self.cycle_result(Cycle::Third) == CycleResult::Empty;
    }
}

impl Entity for EweEnrollment {
    type Id = EnrollmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Partial update: the mutable cycle state, persisted as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentPatch {
    pub attempt_count: Option<u8>,
    pub cycles: Option<[CycleResult; 3]>,
    pub finalized: Option<bool>,
}

impl EweEnrollment {
    /// Patch carrying this enrollment's full mutable state.
    pub fn state_patch(&self) -> EnrollmentPatch {
        EnrollmentPatch {
            attempt_count: Some(self.attempt_count),
            cycles: Some(self.cycles),
            finalized: Some(self.finalized),
        }
    }
}

impl Record for EweEnrollment {
    type Patch = EnrollmentPatch;

    fn apply_patch(&mut self, patch: Self::Patch) {
        if let Some(attempt_count) = patch.attempt_count {
            self.attempt_count = attempt_count;
        }
        if let Some(cycles) = patch.cycles {
            self.cycles = cycles;
        }
        if let Some(finalized) = patch.finalized {
            self.finalized = finalized;
        }
    }
}
