//! Breeding domain module.
//!
//! This crate contains the business rules for mating batches, per-ewe cycle
//! records and confirmed pregnancies, implemented purely as deterministic
//! domain logic (no IO, no HTTP, no storage).

pub mod batch;
pub mod enrollment;
pub mod pregnancy;

pub use batch::{BatchPatch, BatchStatus, BreedingBatch};
pub use enrollment::{Cycle, CycleResult, EnrollmentPatch, EweEnrollment, MatingOutcome};
pub use pregnancy::{
    GESTATION_DAYS, PregnancyOutcome, PregnancyPatch, PregnancyRecord, due_date_for,
};
