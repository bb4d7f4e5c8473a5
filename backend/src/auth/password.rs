//! One-way hashing for passwords and PINs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Hashing failed: {0}")]
    HashFailed(String),

    #[error("Stored hash is malformed: {0}")]
    MalformedHash(String),
}

/// Opaque one-way hash + verify capability
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable
    fn verify(&self, secret: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// bcrypt with a configurable work factor
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl SecretHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> Result<String, PasswordError> {
        bcrypt::hash(secret, self.cost).map_err(|e| PasswordError::HashFailed(e.to_string()))
    }

    fn verify(&self, secret: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(secret, hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("1234").unwrap();

        assert_ne!(hash, "1234");
        assert!(hasher.verify("1234", &hash).unwrap());
        assert!(!hasher.verify("0000", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = BcryptHasher::new(4);
        assert_ne!(hasher.hash("1234").unwrap(), hasher.hash("1234").unwrap());
    }

    #[test]
    fn test_malformed_hash() {
        let hasher = BcryptHasher::new(4);
        assert!(matches!(
            hasher.verify("1234", "not-a-bcrypt-hash"),
            Err(PasswordError::MalformedHash(_))
        ));
    }
}
