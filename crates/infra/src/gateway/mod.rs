//! Persistence gateway: generic per-collection CRUD.
//!
//! Five collections back the breeding subsystem: batches, enrollments,
//! pregnancy records, herd categories and the animal registry. No operation
//! here spans collections; cross-record consistency is the services' job,
//! which is why they order their writes for damage control (see
//! `crate::cycle`).

pub mod collection;
pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use sqlx::PgPool;

use ovino_breeding::{BreedingBatch, EweEnrollment, PregnancyRecord};
use ovino_herd::{Animal, Group};

pub use collection::{Collection, StoreError};
pub use in_memory::InMemoryCollection;
pub use postgres::{PgCollection, ensure_schema};

/// The gateway bundle handed to every service.
///
/// Collections are `Arc<dyn ..>` so a test can swap any single one for a
/// failure-injecting double while keeping the rest real.
#[derive(Clone)]
pub struct Gateway {
    pub batches: Arc<dyn Collection<BreedingBatch>>,
    pub enrollments: Arc<dyn Collection<EweEnrollment>>,
    pub pregnancies: Arc<dyn Collection<PregnancyRecord>>,
    pub groups: Arc<dyn Collection<Group>>,
    pub animals: Arc<dyn Collection<Animal>>,
}

impl Gateway {
    /// Gateway over in-memory collections (tests, local fallback store).
    pub fn in_memory() -> Self {
        Self {
            batches: Arc::new(InMemoryCollection::new()),
            enrollments: Arc::new(InMemoryCollection::new()),
            pregnancies: Arc::new(InMemoryCollection::new()),
            groups: Arc::new(InMemoryCollection::new()),
            animals: Arc::new(InMemoryCollection::new()),
        }
    }

    /// Gateway over the shared Postgres document table.
    ///
    /// Call [`ensure_schema`] once at startup before using this.
    pub fn postgres(pool: PgPool) -> Self {
        let pool = Arc::new(pool);
        Self {
            batches: Arc::new(PgCollection::new(pool.clone(), "breeding_batches")),
            enrollments: Arc::new(PgCollection::new(pool.clone(), "ewe_enrollments")),
            pregnancies: Arc::new(PgCollection::new(pool.clone(), "pregnancy_records")),
            groups: Arc::new(PgCollection::new(pool.clone(), "groups")),
            animals: Arc::new(PgCollection::new(pool, "animals")),
        }
    }
}
