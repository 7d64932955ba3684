//! GeminiProvider -- [`ChatProvider`] implementation for Google Gemini.
//!
//! Talks to the Generative Language REST API (`generateContent` and
//! `streamGenerateContent?alt=sse`). The API key is held as a
//! [`SecretString`] and only exposed when building the request URL.

use std::time::{Duration, Instant};

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{Instrument, debug, error, info, info_span};

use parley_core::ai::provider::{ChatProvider, ChunkStream};
use parley_core::retry::{RetryPolicy, retry};
use parley_types::ai::{
    AiError, AiErrorCode, GenerationRequest, GenerationResponse, StreamChunk,
};
use parley_types::config::AiConfig;

use super::error::{self, Failure};
use super::types::{GeminiRequest, GeminiResponse};

const MISSING_KEY: &str = "GEMINI_API_KEY chưa được cấu hình trong environment variables.";

/// Google Gemini chat provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
    block_dangerous_content: bool,
    retry: RetryPolicy,
    log_requests: bool,
    log_responses: bool,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        let gemini = &config.gemini;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(gemini.timeout_secs))
            .build()
            .map_err(error::unknown)?;

        let api_key = gemini
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(|k| SecretString::from(k.to_string()));

        Ok(Self {
            client,
            api_key,
            base_url: gemini.base_url.trim_end_matches('/').to_string(),
            model: gemini.model.clone(),
            block_dangerous_content: gemini.block_dangerous_content,
            retry: RetryPolicy::new(
                gemini.max_retries,
                gemini.retry_min_wait_secs,
                gemini.retry_max_wait_secs,
            ),
            log_requests: config.log_requests,
            log_responses: config.log_responses,
        })
    }

    fn api_key(&self) -> Result<&SecretString, AiError> {
        self.api_key
            .as_ref()
            .ok_or_else(|| AiError::new(AiErrorCode::ApiKey, MISSING_KEY))
    }

    fn url(&self, action: &str) -> String {
        format!("{}/models/{}:{action}", self.base_url, self.model)
    }

    fn build_body(&self, request: &GenerationRequest) -> GeminiRequest {
        if self.log_requests {
            debug!(
                prompt = %request.prompt,
                history = request.history.len(),
                persona = request.persona.as_ref().map(|p| p.name.as_str()),
                "Gemini request"
            );
        }
        GeminiRequest::from_turns(
            &request.full_history(),
            &request.params,
            self.block_dangerous_content,
        )
    }
}

/// One POST attempt; non-2xx statuses become a [`Failure`].
async fn post(
    client: &reqwest::Client,
    url: &str,
    api_key: &SecretString,
    body: &GeminiRequest,
) -> Result<reqwest::Response, Failure> {
    let response = client
        .post(url)
        .query(&[("key", api_key.expose_secret())])
        .json(body)
        .send()
        .await
        .map_err(|e| error::from_transport(&e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(error::from_status(status.as_u16(), &text))
}

impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError> {
        let api_key = self.api_key()?;
        let body = self.build_body(request);
        let url = self.url("generateContent");

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = "gemini",
            gen_ai.request.model = %self.model,
            gen_ai.request.max_tokens = request.params.max_tokens,
            gen_ai.request.temperature = request.params.temperature,
            gen_ai.request.stream = false,
        );

        async move {
            let start = Instant::now();
            let response = retry(
                &self.retry,
                "Gemini",
                |f: &Failure| f.retryable,
                |_| post(&self.client, &url, api_key, &body),
            )
            .await
            .map_err(|(failure, retries)| {
                error!(error = %failure, retries, "Gemini generation error");
                failure.error
            })?
            .value;

            let parsed: GeminiResponse = response.json().await.map_err(|e| {
                error!(error = %e, "Gemini response could not be parsed");
                error::unknown(e)
            })?;

            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            let tokens_used = parsed.total_tokens().unwrap_or(0);
            let finish_reason = if parsed.is_blocked() {
                "content_filter"
            } else {
                "stop"
            };
            let content = parsed.text();

            info!(
                tokens = tokens_used,
                latency_ms = latency_ms as u64,
                finish_reason,
                "Gemini generation completed"
            );
            if self.log_responses {
                debug!(content = %content, "Gemini response");
            }

            Ok(GenerationResponse {
                content,
                finish_reason: finish_reason.to_string(),
                tokens_used,
                model: self.model.clone(),
                latency_ms,
                cached: false,
            })
        }
        .instrument(span)
        .await
    }

    fn generate_stream(&self, request: GenerationRequest) -> ChunkStream {
        let api_key = match self.api_key() {
            Ok(key) => SecretString::from(key.expose_secret().to_string()),
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err::<StreamChunk, _>(e) })),
        };
        let body = self.build_body(&request);
        let url = self.url("streamGenerateContent?alt=sse");
        let client = self.client.clone();
        let policy = self.retry.clone();
        let log_responses = self.log_responses;

        let span = info_span!(
            "gen_ai.stream",
            gen_ai.system = "gemini",
            gen_ai.request.model = %self.model,
            gen_ai.request.max_tokens = request.params.max_tokens,
            gen_ai.request.temperature = request.params.temperature,
            gen_ai.request.stream = true,
        );

        Box::pin(async_stream::stream! {
            // Only opening the stream is retried; a broken stream ends the reply.
            let opened = retry(&policy, "Gemini", |f: &Failure| f.retryable, |_| {
                post(&client, &url, &api_key, &body)
            })
            .instrument(span.clone())
            .await;

            let response = match opened {
                Ok(retried) => retried.value,
                Err((failure, retries)) => {
                    span.in_scope(|| error!(error = %failure, retries, "Gemini streaming error"));
                    yield Err(failure.error);
                    return;
                }
            };

            let mut events = response.bytes_stream().eventsource();
            let mut total_tokens = 0;
            let mut full_text = String::new();

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        span.in_scope(|| error!(error = %e, "Gemini stream interrupted"));
                        yield Err(AiError::from_code(AiErrorCode::Network));
                        return;
                    }
                };
                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                let chunk: GeminiResponse = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(error = %e, data = %data, "skipping unparseable Gemini SSE chunk");
                        continue;
                    }
                };
                if let Some(tokens) = chunk.total_tokens() {
                    total_tokens = tokens;
                }
                let text = chunk.text();
                if !text.is_empty() {
                    if log_responses {
                        full_text.push_str(&text);
                    }
                    yield Ok(StreamChunk {
                        content: text,
                        is_final: false,
                        tokens_used: 0,
                    });
                }
            }

            span.in_scope(|| {
                info!(tokens = total_tokens, "Gemini streaming completed");
                if log_responses {
                    debug!(content = %full_text, "Gemini streamed response");
                }
            });
            yield Ok(StreamChunk {
                content: String::new(),
                is_final: true,
                tokens_used: total_tokens,
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockServer;
    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use parley_types::config::GeminiConfig;
    use parley_types::message::MessageRole;
    use parley_types::ai::{ChatTurn, PersonaContext};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct Recorded {
        calls: AtomicU32,
        fail_first: u32,
        fail_status: u16,
        fail_body: String,
        last_body: Mutex<Option<Value>>,
        last_path: Mutex<Option<String>>,
        last_key: Mutex<Option<String>>,
    }

    async fn handle(
        State(state): State<Arc<Recorded>>,
        Path(call): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        Json(body): Json<Value>,
    ) -> axum::response::Response {
        let n = state.calls.fetch_add(1, Ordering::SeqCst);
        *state.last_body.lock().unwrap() = Some(body);
        *state.last_path.lock().unwrap() = Some(call.clone());
        *state.last_key.lock().unwrap() = query.get("key").cloned();

        if n < state.fail_first {
            let status = StatusCode::from_u16(state.fail_status).unwrap();
            return (status, state.fail_body.clone()).into_response();
        }

        if call.ends_with(":streamGenerateContent") {
            let events = [
                json!({"candidates": [{"content": {"parts": [{"text": "Chào "}]}}]}),
                json!({"candidates": [{"content": {"parts": [{"text": "thầy"}]}}], "usageMetadata": {"totalTokenCount": 17}}),
            ];
            let body: String = events.iter().map(|e| format!("data: {e}\n\n")).collect();
            return ([("content-type", "text/event-stream")], body).into_response();
        }

        Json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Chào thầy, "}, {"text": "con tôi ổn."}]}, "finishReason": "STOP"}],
            "usageMetadata": {"totalTokenCount": 42}
        }))
        .into_response()
    }

    async fn start(state: Recorded) -> (MockServer, Arc<Recorded>) {
        let state = Arc::new(state);
        let router = Router::new()
            .route("/models/{call}", post(handle))
            .with_state(state.clone());
        (MockServer::start(router).await, state)
    }

    fn provider(base_url: String, api_key: Option<&str>) -> GeminiProvider {
        let config = AiConfig {
            gemini: GeminiConfig {
                api_key: api_key.map(str::to_string),
                model: "test-model".to_string(),
                base_url,
                retry_min_wait_secs: 0.001,
                retry_max_wait_secs: 0.002,
                ..Default::default()
            },
            ..Default::default()
        };
        GeminiProvider::new(&config).unwrap()
    }

    fn request() -> GenerationRequest {
        let mut request = GenerationRequest::new("Con tôi học thế nào?");
        request.history = vec![ChatTurn::new(MessageRole::Assistant, "Chào thầy")];
        request.persona = Some(PersonaContext {
            system_prompt: "Bạn là Chị Hương.".to_string(),
            ..Default::default()
        });
        request
    }

    #[tokio::test]
    async fn test_generate_success() {
        let (server, state) = start(Recorded::default()).await;
        let provider = provider(server.base_url(), Some("secret-key"));

        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.content, "Chào thầy, con tôi ổn.");
        assert_eq!(response.tokens_used, 42);
        assert_eq!(response.finish_reason, "stop");
        assert_eq!(response.model, "test-model");
        assert!(!response.cached);

        assert_eq!(
            state.last_path.lock().unwrap().as_deref(),
            Some("test-model:generateContent")
        );
        assert_eq!(state.last_key.lock().unwrap().as_deref(), Some("secret-key"));
        let body = state.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Bạn là Chị Hương.");
        assert_eq!(body["contents"][0]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["text"], "Con tôi học thế nào?");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let provider = provider("http://127.0.0.1:9".to_string(), None);
        assert!(!provider.is_configured());
        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.code, AiErrorCode::ApiKey);
        assert_eq!(err.message, MISSING_KEY);

        let mut stream = provider.generate_stream(request());
        let first = stream.next().await.unwrap();
        assert_eq!(first.unwrap_err().code, AiErrorCode::ApiKey);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let (server, state) = start(Recorded {
            fail_first: 2,
            fail_status: 503,
            ..Default::default()
        })
        .await;
        let provider = provider(server.base_url(), Some("k"));

        let response = provider.generate(&request()).await.unwrap();
        assert_eq!(response.tokens_used, 42);
        assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let (server, state) = start(Recorded {
            fail_first: 10,
            fail_status: 500,
            ..Default::default()
        })
        .await;
        let provider = provider(server.base_url(), Some("k"));

        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.code, AiErrorCode::Generation);
        assert_eq!(err.message, "Lỗi server Gemini. Vui lòng thử lại.");
        assert_eq!(state.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_quota_is_not_retried() {
        let (server, state) = start(Recorded {
            fail_first: 10,
            fail_status: 429,
            fail_body: "Quota exceeded for project".to_string(),
            ..Default::default()
        })
        .await;
        let provider = provider(server.base_url(), Some("k"));

        let err = provider.generate(&request()).await.unwrap_err();
        assert_eq!(err.code, AiErrorCode::QuotaExceeded);
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_chunks_then_final() {
        let (server, state) = start(Recorded::default()).await;
        let provider = provider(server.base_url(), Some("k"));

        let chunks: Vec<StreamChunk> = provider
            .generate_stream(request())
            .map(|c| c.unwrap())
            .collect()
            .await;

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["Chào ", "thầy", ""]);
        let last = chunks.last().unwrap();
        assert!(last.is_final);
        assert_eq!(last.tokens_used, 17);
        assert_eq!(
            state.last_path.lock().unwrap().as_deref(),
            Some("test-model:streamGenerateContent")
        );
    }

    #[tokio::test]
    async fn test_stream_connection_error() {
        let (server, _state) = start(Recorded {
            fail_first: 10,
            fail_status: 401,
            ..Default::default()
        })
        .await;
        let provider = provider(server.base_url(), Some("k"));

        let items: Vec<Result<StreamChunk, AiError>> =
            provider.generate_stream(request()).collect().await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap_err().code, AiErrorCode::ApiKey);
    }
}
