//! SpeechToText trait definition.

use parley_types::transcription::{TranscriptionError, TranscriptionOptions, TranscriptionResult};

/// A transcription backend. The Whisper client lives in parley-infra.
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    /// Validate and transcribe one audio upload.
    fn transcribe(
        &self,
        audio: Vec<u8>,
        options: &TranscriptionOptions,
    ) -> impl std::future::Future<Output = Result<TranscriptionResult, TranscriptionError>> + Send;
}
