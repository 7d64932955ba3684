//! Speech-to-text backends.

pub mod whisper;

pub use whisper::WhisperClient;
