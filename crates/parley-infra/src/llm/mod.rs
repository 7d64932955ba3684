//! Chat-model provider implementations.
//!
//! [`create_chat_provider`] picks the backend named by `ai.provider`.

pub mod gemini;

use parley_core::ai::box_provider::BoxChatProvider;
use parley_types::ai::{AiError, AiErrorCode};
use parley_types::config::AiConfig;

use self::gemini::GeminiProvider;

/// Build the configured chat provider.
///
/// A provider without credentials is still returned; it reports itself as
/// unconfigured and fails each call with an API key error.
pub fn create_chat_provider(config: &AiConfig) -> Result<BoxChatProvider, AiError> {
    match config.provider.as_str() {
        "gemini" => {
            let provider = GeminiProvider::new(config)?;
            if !config.gemini.is_configured() {
                tracing::warn!("GEMINI_API_KEY is not set; AI replies will fail");
            }
            Ok(BoxChatProvider::new(provider))
        }
        other => Err(AiError::new(
            AiErrorCode::InvalidRequest,
            format!("Unsupported AI provider: {other}"),
        )),
    }
}
