//! Secret comparison.
//!
//! The hash primitive is a collaborator: callers only see `SecretComparator`.

use crate::error::AuthError;

/// Compare a plaintext secret with a stored hash.
pub trait SecretComparator: Send + Sync {
    fn compare(&self, plaintext: &str, hash: &str) -> bool;

    /// A well-formed hash at this comparator's work factor that no secret
    /// matches. Login compares against it when no account was found.
    fn decoy_hash(&self) -> String;
}

/// bcrypt-backed comparator.
#[derive(Debug, Clone, Copy)]
pub struct BcryptComparator {
    cost: u32,
}

impl BcryptComparator {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a secret with this comparator's cost (used by the bootstrap seed).
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        bcrypt::hash(plaintext, self.cost).map_err(|e| AuthError::Crypto(format!("bcrypt hash: {e}")))
    }
}

impl Default for BcryptComparator {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl SecretComparator for BcryptComparator {
    fn compare(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(matched) => matched,
            Err(e) => {
                // A malformed stored hash never authenticates anyone.
                tracing::warn!("bcrypt verify failed: {e}");
                false
            }
        }
    }

    fn decoy_hash(&self) -> String {
        // Zero salt and zero digest in bcrypt's base64 alphabet.
        format!("$2b${:02}${}", self.cost, ".".repeat(53))
    }
}
