//! Cryptographic operations for Parley.
//!
//! - `password`: Argon2id password hashing for user accounts

pub mod password;
