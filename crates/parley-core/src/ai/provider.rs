//! ChatProvider trait definition.
//!
//! Uses RPITIT for `generate` and a boxed stream for `generate_stream`, so
//! the trait stays usable behind `BoxChatProvider`.

use std::pin::Pin;

use futures_util::Stream;
use parley_types::ai::{AiError, GenerationRequest, GenerationResponse, StreamChunk};

/// Boxed stream of reply chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AiError>> + Send + 'static>>;

/// A chat model backend that can play a persona.
///
/// Implementations live in parley-infra (e.g., `GeminiProvider`).
pub trait ChatProvider: Send + Sync {
    /// Provider name reported by the health endpoint (e.g., "gemini").
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether credentials are present. Unconfigured providers fail every call.
    fn is_configured(&self) -> bool;

    /// Generate a full reply.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<GenerationResponse, AiError>> + Send;

    /// Stream a reply. The last item is a chunk with `is_final` set.
    fn generate_stream(&self, request: GenerationRequest) -> ChunkStream;
}
