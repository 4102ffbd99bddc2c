//! Infrastructure layer: persistence gateway and the breeding services.
//!
//! The domain crates (`ovino-breeding`, `ovino-herd`) stay pure; everything
//! that touches storage lives here: the generic per-collection CRUD gateway,
//! the group resolver, the cycle service, the batch lifecycle manager and the
//! pregnancy record service.

pub mod batch;
pub mod cycle;
pub mod error;
pub mod gateway;
pub mod pregnancy;
pub mod resolver;

mod integration_tests;

pub use batch::{BatchManager, CascadeReport};
pub use cycle::{CycleService, PregnancyCleanup, RemovalReport};
pub use error::ServiceError;
pub use gateway::{Collection, Gateway, InMemoryCollection, StoreError};
pub use pregnancy::PregnancyService;
pub use resolver::GroupResolver;
