//! OpenTelemetry GenAI semantic-convention attribute names.
//!
//! Usable as field names in `tracing::info_span!` so provider calls made by
//! the HTTP layer carry the same keys an OTel collector expects.

/// The name of the operation being performed (e.g., "chat", "transcribe").
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The name of the GenAI provider (e.g., "gemini").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

/// Total tokens reported by the provider for the call.
pub const GEN_AI_USAGE_TOTAL_TOKENS: &str = "gen_ai.usage.total_tokens";

/// The finish reason of the response (e.g., "stop", "content_filter").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

// --- Operation name values ---

/// Single-shot persona reply.
pub const OP_CHAT: &str = "chat";

/// Streamed persona reply.
pub const OP_CHAT_STREAM: &str = "chat_stream";

/// Speech-to-text.
pub const OP_TRANSCRIBE: &str = "transcribe";
