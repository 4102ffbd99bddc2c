//! Herd registry domain module.
//!
//! This crate contains the animal and herd-category records touched by the
//! breeding subsystem, implemented purely as deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod animal;
pub mod group;

pub use animal::{Animal, AnimalPatch};
pub use group::{Group, GroupPatch, HerdCategory};
