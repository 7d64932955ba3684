//! BoxChatProvider -- object-safe dynamic dispatch wrapper for ChatProvider.
//!
//! 1. `ChatProviderDyn` is the object-safe twin with boxed futures.
//! 2. A blanket impl covers every `T: ChatProvider`.
//! 3. `BoxChatProvider` wraps `Box<dyn ChatProviderDyn>` and is itself a
//!    `ChatProvider`, so services stay generic over the trait.

use std::future::Future;
use std::pin::Pin;

use parley_types::ai::{AiError, GenerationRequest, GenerationResponse};

use super::provider::{ChatProvider, ChunkStream};

/// Object-safe version of [`ChatProvider`].
pub trait ChatProviderDyn: Send + Sync {
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    fn is_configured(&self) -> bool;

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, AiError>> + Send + 'a>>;

    fn generate_stream_boxed(&self, request: GenerationRequest) -> ChunkStream;
}

impl<T: ChatProvider> ChatProviderDyn for T {
    fn name(&self) -> &str {
        ChatProvider::name(self)
    }

    fn model(&self) -> &str {
        ChatProvider::model(self)
    }

    fn is_configured(&self) -> bool {
        ChatProvider::is_configured(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = Result<GenerationResponse, AiError>> + Send + 'a>> {
        Box::pin(self.generate(request))
    }

    fn generate_stream_boxed(&self, request: GenerationRequest) -> ChunkStream {
        self.generate_stream(request)
    }
}

/// Type-erased chat provider, chosen at startup from configuration.
pub struct BoxChatProvider {
    inner: Box<dyn ChatProviderDyn + Send + Sync>,
}

impl BoxChatProvider {
    pub fn new<T: ChatProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }
}

impl ChatProvider for BoxChatProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn is_configured(&self) -> bool {
        self.inner.is_configured()
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, AiError> {
        self.inner.generate_boxed(request).await
    }

    fn generate_stream(&self, request: GenerationRequest) -> ChunkStream {
        self.inner.generate_stream_boxed(request)
    }
}
