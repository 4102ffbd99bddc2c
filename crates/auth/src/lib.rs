//! Manager authorization gate.
//!
//! The only privileged operation in the breeding flow is editing an
//! already-finalized cycle result, gated by a shared manager secret. The
//! verifier is deliberately opaque: callers hand over a candidate and get a
//! yes/no back, with no session or token state: every edit attempt
//! re-verifies.

pub mod secret;

pub use secret::{FixedSecret, SecretVerifier};
