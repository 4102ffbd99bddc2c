use std::sync::Arc;

/// Opaque secret comparison collaborator.
///
/// Implementations decide where the secret lives (config, environment, a
/// proper authorization service); the breeding services only ever call
/// `verify`.
pub trait SecretVerifier: Send + Sync {
    fn verify(&self, candidate: &str) -> bool;
}

impl<V> SecretVerifier for Arc<V>
where
    V: SecretVerifier + ?Sized,
{
    fn verify(&self, candidate: &str) -> bool {
        (**self).verify(candidate)
    }
}

/// Verifier holding the secret in memory.
///
/// Comparison runs over every byte regardless of where the first mismatch
/// occurs, so timing does not leak the matching prefix length.
#[derive(Debug, Clone)]
pub struct FixedSecret {
    secret: String,
}

impl FixedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl SecretVerifier for FixedSecret {
    fn verify(&self, candidate: &str) -> bool {
        let expected = self.secret.as_bytes();
        let got = candidate.as_bytes();
        if expected.len() != got.len() {
            return false;
        }
        expected
            .iter()
            .zip(got)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
