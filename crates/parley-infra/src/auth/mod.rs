//! Token signing for the auth service.

pub mod jwt;
