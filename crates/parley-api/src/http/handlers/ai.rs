//! AI handlers: persona chat (plain and SSE), provider health, transcription.

use std::convert::Infallible;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::{HeaderName, StatusCode, header};
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::StreamExt;
use serde_json::{Value, json};
use tracing::{Instrument, field, info, info_span, warn};

use parley_core::ai::provider::ChatProvider;
use parley_core::ai::{AiHealth, validate_chat_request};
use parley_core::stt::provider::SpeechToText;
use parley_observe::genai_attrs;
use parley_types::ai::ChatRequest;
use parley_types::transcription::{TranscriptionError, TranscriptionOptions};

use crate::http::error::AppError;
use crate::http::extractors::auth::CurrentUser;
use crate::http::extractors::json::JsonBody;
use crate::state::AppState;

pub const NO_AUDIO_FILE: &str = "No audio file provided";

/// POST /api/ai/chat/ - Generate one persona reply.
pub async fn chat(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<Json<Value>, AppError> {
    let request = validate_chat_request(body, &state.chat_defaults)
        .map_err(AppError::InvalidChatRequest)?;
    let provider = state.chat_provider.as_ref();

    let span = info_span!(
        "ai.chat",
        gen_ai.operation.name = genai_attrs::OP_CHAT,
        gen_ai.provider.name = provider.name(),
        gen_ai.request.model = provider.model(),
        user_id = %caller.id,
        gen_ai.usage.total_tokens = field::Empty,
        gen_ai.response.finish_reasons = field::Empty,
    );
    let response = provider.generate(&request).instrument(span.clone()).await?;
    span.record(genai_attrs::GEN_AI_USAGE_TOTAL_TOKENS, response.tokens_used);
    span.record(
        genai_attrs::GEN_AI_RESPONSE_FINISH_REASONS,
        response.finish_reason.as_str(),
    );

    Ok(Json(json!({ "success": true, "data": response })))
}

/// POST /api/ai/chat/stream/ - Stream a persona reply as SSE.
///
/// Each chunk is sent as `data: {json}`, followed by `data: [DONE]`. A
/// provider failure is sent as `data: {"error": {...}}` and ends the stream.
pub async fn chat_stream(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    JsonBody(body): JsonBody<ChatRequest>,
) -> Result<impl IntoResponse, AppError> {
    let request = validate_chat_request(body, &state.chat_defaults)
        .map_err(AppError::InvalidChatRequest)?;
    let provider_name = state.chat_provider.name().to_string();
    let mut chunks = state.chat_provider.generate_stream(request);
    let user_id = caller.id;

    let events = async_stream::stream! {
        let mut sent = 0usize;
        let mut tokens = 0i64;
        let mut failed = false;

        while let Some(item) = chunks.next().await {
            match item {
                Ok(chunk) => {
                    sent += 1;
                    tokens = chunk.tokens_used.max(tokens);
                    let data = serde_json::to_string(&chunk).unwrap_or_else(|_| "{}".to_string());
                    yield Ok::<_, Infallible>(Event::default().data(data));
                }
                Err(e) => {
                    warn!(
                        gen_ai.operation.name = genai_attrs::OP_CHAT_STREAM,
                        gen_ai.provider.name = %provider_name,
                        user_id = %user_id,
                        code = %e.code,
                        "Chat stream failed"
                    );
                    yield Ok(Event::default().data(e.to_body().to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            info!(
                gen_ai.operation.name = genai_attrs::OP_CHAT_STREAM,
                gen_ai.provider.name = %provider_name,
                user_id = %user_id,
                chunks = sent,
                tokens,
                "Chat stream finished"
            );
            yield Ok(Event::default().data("[DONE]"));
        }
    };

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::default()),
    ))
}

/// GET /api/ai/health/ - Public provider status.
pub async fn ai_health(State(state): State<AppState>) -> Json<AiHealth> {
    Json(AiHealth::of(state.chat_provider.as_ref()))
}

/// POST /api/ai/transcribe/ - Multipart upload with `file`, optional `language` and `prompt`.
pub async fn transcribe(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, AppError> {
    let mut multipart = multipart.map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?;
    let mut audio: Option<Vec<u8>> = None;
    let mut options = TranscriptionOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                options.filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?;
                audio = Some(bytes.to_vec());
            }
            "language" | "prompt" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?;
                let value = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                if name == "language" {
                    options.language = value;
                } else {
                    options.prompt = value;
                }
            }
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| TranscriptionError::Validation(NO_AUDIO_FILE.to_string()))?;
    let stt = state.speech_to_text.as_ref();
    let span = info_span!(
        "ai.transcribe",
        gen_ai.operation.name = genai_attrs::OP_TRANSCRIBE,
        gen_ai.provider.name = stt.name(),
        user_id = %caller.id,
        audio_bytes = audio.len(),
    );
    let result = stt.transcribe(audio, &options).instrument(span).await?;

    Ok(Json(json!({ "success": true, "data": result })))
}
