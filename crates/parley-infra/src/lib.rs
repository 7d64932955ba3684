//! Infrastructure layer for Parley.
//!
//! Implements the ports defined in `parley-core`: SQLite repositories,
//! argon2 password hashing, JWT issuing, the Gemini chat client and the
//! Whisper transcription client. Also loads configuration and carries the
//! built-in persona seed set.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod llm;
pub mod seed;
pub mod sqlite;
pub mod stt;

#[cfg(test)]
pub(crate) mod testing;
