//! Domain failure taxonomy shared by every crate in the workspace.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business failure.
///
/// Everything here is decidable from the records themselves; storage and
/// connectivity failures are the infra layer's `StoreError` concern.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected before any write (blank batch name, a pregnant ewe
    /// offered as a mating candidate).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state rule was broken (cycle recorded out of sequence, enrollment
    /// into a closed batch, result recorded on a finalized enrollment).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The addressed batch, animal or record does not exist.
    #[error("not found")]
    NotFound,

    /// The operation collides with existing state (a second enrollment while
    /// one is still active in an open batch, closing a closed batch).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The manager secret did not verify.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
