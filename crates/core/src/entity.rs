//! Identity for persisted records.

/// A record with a stable, strongly-typed identity.
///
/// The id never changes across state transitions: an enrollment stays the
/// same enrollment while its cycles resolve, a batch stays the same batch
/// through close and reopen.
pub trait Entity {
    /// Identifier type. The bounds are what the storage gateway needs: usable
    /// as a map key, loggable, and shareable across threads.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + Send + Sync;

    /// Returns the record's identifier.
    fn id(&self) -> &Self::Id;
}
