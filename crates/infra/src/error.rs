//! Operation-level error model.

use thiserror::Error;

use ovino_core::{AnimalId, DomainError};

use crate::gateway::StoreError;

/// Failure of a breeding-service operation.
///
/// Domain failures (preconditions, invariants, authorization) and storage
/// failures (conflicts, connectivity) stay distinguishable so callers can
/// decide between fixing the request and retrying it. `CascadeFailed` is the
/// one partial-progress case: batch deletion reports exactly which animals
/// were already released before the cascade stopped.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Batch deletion released some enrollments and then hit a failure; the
    /// batch record was left in place.
    #[error("batch release cascade stopped: {} released, {} failed", released.len(), failed.len())]
    CascadeFailed {
        released: Vec<AnimalId>,
        /// Animals whose release failed, with the failure rendered as text.
        failed: Vec<(AnimalId, String)>,
    },
}

impl ServiceError {
    /// True when retrying the same call can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Store(StoreError::Unavailable(_)) => true,
            ServiceError::CascadeFailed { .. } => true,
            ServiceError::Domain(_) | ServiceError::Store(_) => false,
        }
    }
}
