//! Business logic and port traits for Parley.
//!
//! This crate defines the "ports" (repository and provider traits) that the
//! infrastructure layer implements, plus the services that enforce the
//! validation and ownership rules. It depends only on `parley-types` --
//! never on `parley-infra` or any database/IO crate.

pub mod ai;
pub mod auth;
pub mod persona;
pub mod repository;
pub mod retry;
pub mod session;
pub mod stt;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
