//! Peppered bcrypt password hashing.

use crate::error::ApiError;

/// Hashes and verifies passwords as bcrypt over `password + pepper`.
#[derive(Clone)]
pub struct PasswordHasher {
    pepper: String,
    cost: u32,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("pepper", &"<redacted>")
            .field("cost", &self.cost)
            .finish()
    }
}

impl PasswordHasher {
    /// A hasher appending `pepper` and hashing with bcrypt work factor `cost`.
    #[must_use]
    pub fn new(pepper: impl Into<String>, cost: u32) -> Self {
        Self {
            pepper: pepper.into(),
            cost,
        }
    }

    /// Hashes `password`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if bcrypt rejects the input or cost.
    pub fn hash(&self, password: &str) -> Result<String, ApiError> {
        bcrypt::hash(self.peppered(password), self.cost)
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))
    }

    /// Returns `true` if `password` matches `hash`. Malformed hashes never
    /// match.
    #[must_use]
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        bcrypt::verify(self.peppered(password), hash).unwrap_or(false)
    }

    fn peppered(&self, password: &str) -> String {
        format!("{password}{}", self.pepper)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new("zxcvbnm", 4)
    }

    #[test]
    fn hash_then_verify() {
        let h = hasher();
        let Ok(hash) = h.hash("s3cret") else {
            panic!("hashing failed");
        };
        assert_ne!(hash, "s3cret");
        assert!(h.verify("s3cret", &hash));
        assert!(!h.verify("s3cret!", &hash));
    }

    #[test]
    fn pepper_is_part_of_the_hash() {
        let Ok(hash) = hasher().hash("pw") else {
            panic!("hashing failed");
        };
        assert!(!PasswordHasher::new("other", 4).verify("pw", &hash));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!hasher().verify("pw", "not-a-bcrypt-hash"));
    }
}
