use std::pin::Pin;

use futures::Stream;

use crate::errors::ProviderError;
use crate::model::{ModelRef, ProviderId};

/// Normalized event produced by a provider adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// One fragment of generated text. May be empty.
    TextDelta { text: String },
    /// The provider signalled the end of generation.
    Completed,
}

/// Everything an adapter needs to open one completion stream.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub relay_id: uuid::Uuid,
    pub model: ModelRef,
    /// Single user message sent to the model.
    pub prompt: String,
}

/// Boxed stream of provider events.
pub type ProviderEventStream =
    Pin<Box<dyn Stream<Item = Result<ProviderEvent, ProviderError>> + Send + 'static>>;

/// Open provider stream. Dropping it releases the underlying connection.
pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
}

impl ProviderStreamHandle {
    pub fn new(stream: ProviderEventStream) -> Self {
        Self { stream }
    }
}

/// Contract implemented by every upstream LLM integration.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider id this adapter is registered under.
    fn id(&self) -> ProviderId;

    /// Opens a streaming completion for the request.
    ///
    /// Errors returned here mean the stream could not be opened at all;
    /// failures after that point are yielded from the stream.
    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError>;
}
