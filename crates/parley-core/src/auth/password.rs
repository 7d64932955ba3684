//! PasswordHasher trait for one-way password storage.
//!
//! The argon2 adapter lives in parley-infra.

/// Abstraction over password hashing.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` into a self-describing (PHC) string.
    fn hash(&self, password: &str) -> Result<String, String>;

    /// Check `password` against a stored hash. Malformed hashes never verify.
    fn verify(&self, password: &str, hash: &str) -> bool;
}
