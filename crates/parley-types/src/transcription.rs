//! Speech-to-text request, result and error types.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Per-request transcription options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptionOptions {
    /// Original filename; its extension decides the audio format.
    pub filename: String,
    /// Language code (`vi`, `en`, ...). Falls back to the configured default.
    pub language: Option<String>,
    /// Context hint passed to the model.
    pub prompt: Option<String>,
    /// Falls back to the configured default.
    pub response_format: Option<String>,
}

impl TranscriptionOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Default::default()
        }
    }
}

/// A finished transcription. Segments and words are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<Value>,
    #[serde(default)]
    pub words: Vec<Value>,
}

/// What was learned about an audio upload during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMetadata {
    pub filename: String,
    pub size_bytes: usize,
    pub format: String,
}

/// Per-request numbers logged after every transcription attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptionMetrics {
    pub request_id: String,
    pub duration_ms: f64,
    pub audio_size_bytes: usize,
    pub audio_duration_seconds: Option<f64>,
    pub transcript_length: usize,
    pub language: String,
    pub retry_count: u32,
    pub success: bool,
    pub error: Option<String>,
}

/// Transcription failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptionError {
    /// Missing or rejected credentials.
    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    RateLimit(String),

    #[error("{0}")]
    Timeout(String),

    /// The upload was rejected before reaching the API.
    #[error("{0}")]
    Validation(String),

    /// Any other API or transport failure.
    #[error("{0}")]
    Api(String),
}

impl TranscriptionError {
    pub fn code(&self) -> &'static str {
        match self {
            TranscriptionError::Config(_) => "CONFIG_ERROR",
            TranscriptionError::RateLimit(_) => "RATE_LIMIT_ERROR",
            TranscriptionError::Timeout(_) => "TIMEOUT_ERROR",
            TranscriptionError::Validation(_) => "INVALID_AUDIO",
            TranscriptionError::Api(_) => "TRANSCRIPTION_ERROR",
        }
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TranscriptionError::RateLimit(_) | TranscriptionError::Timeout(_)
        )
    }

    /// `{"error": {"code", "message"}}`
    pub fn to_body(&self) -> Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}
