//! Shared domain types for Parley.
//!
//! Users, personas, practice sessions and their messages, plus the chat-model
//! and speech-to-text payloads and the error types every layer shares.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod ai;
pub mod config;
pub mod error;
pub mod message;
pub mod persona;
pub mod session;
pub mod transcription;
pub mod user;
