//! Google Gemini chat backend.

mod client;
mod error;
mod types;

pub use client::GeminiProvider;
