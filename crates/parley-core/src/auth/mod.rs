//! Accounts and JWT authentication.
//!
//! `AuthService` owns registration, login, token refresh/revocation and
//! profile edits. Hashing and token signing sit behind the `PasswordHasher`
//! and `TokenIssuer` ports so core stays free of crypto crates.

pub mod password;
pub mod service;
pub mod token;
