//! BoxSpeechToText -- dynamic dispatch wrapper for SpeechToText, built the
//! same way as `BoxChatProvider`.

use std::future::Future;
use std::pin::Pin;

use parley_types::transcription::{TranscriptionError, TranscriptionOptions, TranscriptionResult};

use super::provider::SpeechToText;

type TranscribeFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TranscriptionResult, TranscriptionError>> + Send + 'a>>;

pub trait SpeechToTextDyn: Send + Sync {
    fn name(&self) -> &str;

    fn is_configured(&self) -> bool;

    fn transcribe_boxed<'a>(
        &'a self,
        audio: Vec<u8>,
        options: &'a TranscriptionOptions,
    ) -> TranscribeFuture<'a>;
}

impl<T: SpeechToText> SpeechToTextDyn for T {
    fn name(&self) -> &str {
        SpeechToText::name(self)
    }

    fn is_configured(&self) -> bool {
        SpeechToText::is_configured(self)
    }

    fn transcribe_boxed<'a>(
        &'a self,
        audio: Vec<u8>,
        options: &'a TranscriptionOptions,
    ) -> TranscribeFuture<'a> {
        Box::pin(self.transcribe(audio, options))
    }
}

pub struct BoxSpeechToText {
    inner: Box<dyn SpeechToTextDyn + Send + Sync>,
}

impl BoxSpeechToText {
    pub fn new<T: SpeechToText + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }
}

impl SpeechToText for BoxSpeechToText {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        self.inner.transcribe_boxed(audio, options).await
    }
}
