//! WhisperClient -- [`SpeechToText`] over the OpenAI audio transcription API.
//!
//! Uploads are validated locally first, then sent as multipart form data.
//! Timeouts, connection failures and rate limits are retried; every call
//! ends with one structured metrics log line.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};

use parley_core::retry::{Retried, RetryPolicy, retry};
use parley_core::stt::audio::validate_audio;
use parley_core::stt::provider::SpeechToText;
use parley_types::config::WhisperConfig;
use parley_types::transcription::{
    TranscriptionError, TranscriptionMetrics, TranscriptionOptions, TranscriptionResult,
};

/// A failed attempt and whether the retry loop may try again.
struct Failure {
    error: TranscriptionError,
    retryable: bool,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl From<TranscriptionError> for Failure {
    fn from(error: TranscriptionError) -> Self {
        let retryable = error.is_retryable();
        Self { error, retryable }
    }
}

/// Map a non-2xx Whisper response.
fn from_status(status: u16, body: &str) -> TranscriptionError {
    match status {
        429 => TranscriptionError::RateLimit("Rate limit exceeded".to_string()),
        401 => TranscriptionError::Config("Invalid OpenAI API key".to_string()),
        s if s >= 500 => TranscriptionError::Api(format!("Whisper API server error: {s}")),
        s => TranscriptionError::Api(format!("Whisper API error ({s}): {body}")),
    }
}

/// OpenAI Whisper transcription client.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    config: WhisperConfig,
    retry: RetryPolicy,
    request_count: AtomicU64,
}

impl WhisperClient {
    pub fn new(config: &WhisperConfig) -> Result<Self, TranscriptionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TranscriptionError::Api(e.to_string()))?;

        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::from(k.to_string()));
        if api_key.is_none() {
            warn!("Whisper client created without an API key; set OPENAI_API_KEY");
        }

        Ok(Self {
            client,
            api_key,
            retry: RetryPolicy::new(
                config.max_retries,
                config.retry_min_wait_secs,
                config.retry_max_wait_secs,
            ),
            config: config.clone(),
            request_count: AtomicU64::new(0),
        })
    }

    fn next_request_id(&self) -> String {
        let n = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        format!("whisper_{}_{n}", chrono::Utc::now().timestamp())
    }

    fn form(&self, audio: &[u8], options: &TranscriptionOptions, language: &str) -> Form {
        let response_format = options
            .response_format
            .clone()
            .unwrap_or_else(|| self.config.response_format.clone());

        let mut form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec()).file_name(options.filename.clone()),
            )
            .text("model", self.config.model.clone());
        if !language.is_empty() {
            form = form.text("language", language.to_string());
        }
        if let Some(prompt) = options.prompt.as_deref().filter(|p| !p.is_empty()) {
            form = form.text("prompt", prompt.to_string());
        }
        form.text("response_format", response_format)
    }

    async fn attempt(
        &self,
        api_key: &SecretString,
        audio: &[u8],
        options: &TranscriptionOptions,
        language: &str,
    ) -> Result<TranscriptionResult, Failure> {
        let url = format!(
            "{}/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key.expose_secret())
            .multipart(self.form(audio, options, language))
            .send()
            .await
            .map_err(|e| self.transport_failure(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_failure(&e))?;
        if !status.is_success() {
            let err = from_status(status.as_u16(), &body);
            if status.as_u16() == 429 {
                warn!("Whisper API rate limit exceeded");
            }
            return Err(err.into());
        }

        let format = options
            .response_format
            .as_deref()
            .unwrap_or(&self.config.response_format);
        if matches!(format, "json" | "verbose_json") {
            serde_json::from_str(&body).map_err(|e| {
                Failure::from(TranscriptionError::Api(format!(
                    "Invalid Whisper response: {e}"
                )))
            })
        } else {
            // text, srt and vtt come back as the raw transcript.
            Ok(TranscriptionResult {
                text: body,
                ..Default::default()
            })
        }
    }

    fn transport_failure(&self, err: &reqwest::Error) -> Failure {
        if err.is_timeout() {
            warn!(timeout_secs = self.config.timeout_secs, "Whisper API timeout");
            return TranscriptionError::Timeout(format!(
                "Request timed out after {}s",
                self.config.timeout_secs
            ))
            .into();
        }
        Failure {
            error: TranscriptionError::Api(format!("Whisper connection error: {err}")),
            retryable: err.is_connect(),
        }
    }
}

fn log_metrics(metrics: &TranscriptionMetrics) {
    if metrics.success {
        info!(
            request_id = %metrics.request_id,
            duration_ms = metrics.duration_ms,
            audio_size_bytes = metrics.audio_size_bytes,
            audio_duration_seconds = metrics.audio_duration_seconds,
            transcript_length = metrics.transcript_length,
            language = %metrics.language,
            retry_count = metrics.retry_count,
            success = true,
            "Transcription metrics"
        );
    } else {
        error!(
            request_id = %metrics.request_id,
            duration_ms = metrics.duration_ms,
            audio_size_bytes = metrics.audio_size_bytes,
            language = %metrics.language,
            retry_count = metrics.retry_count,
            success = false,
            error = metrics.error.as_deref(),
            "Transcription metrics"
        );
    }
}

impl SpeechToText for WhisperClient {
    fn name(&self) -> &str {
        "whisper"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult, TranscriptionError> {
        let start = Instant::now();
        let language = options
            .language
            .clone()
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| self.config.default_language.clone());
        let mut metrics = TranscriptionMetrics {
            request_id: self.next_request_id(),
            audio_size_bytes: audio.len(),
            language: language.clone(),
            ..Default::default()
        };

        let outcome: Result<Retried<TranscriptionResult>, (TranscriptionError, u32)> = async {
            let meta = validate_audio(&audio, &options.filename, &self.config)
                .map_err(|e| (e, 0))?;
            info!(
                request_id = %metrics.request_id,
                format = %meta.format,
                size = meta.size_bytes,
                model = %self.config.model,
                language = %language,
                "Starting transcription"
            );

            let api_key = self.api_key.as_ref().ok_or_else(|| {
                (
                    TranscriptionError::Config("OpenAI API key not configured".to_string()),
                    0,
                )
            })?;

            retry(
                &self.retry,
                "Whisper",
                |f: &Failure| f.retryable,
                |_| self.attempt(api_key, &audio, options, &language),
            )
            .await
            .map_err(|(failure, retries)| (failure.error, retries))
        }
        .await;

        metrics.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match outcome {
            Ok(retried) => {
                let result = retried.value;
                metrics.retry_count = retried.retries;
                metrics.audio_duration_seconds = result.duration;
                metrics.transcript_length = result.text.chars().count();
                metrics.success = true;
                log_metrics(&metrics);
                Ok(result)
            }
            Err((err, retries)) => {
                metrics.retry_count = retries;
                metrics.error = Some(err.to_string());
                log_metrics(&metrics);
                Err(err)
            }
        }
    }
}
