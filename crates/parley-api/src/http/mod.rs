//! HTTP/REST API layer for Parley.
//!
//! Axum-based REST API under `/api/`, bearer JWT authentication and the
//! `{"success": false, "error": {...}}` error envelope.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
