use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use recipe_core::SseDecoder;
use tracing::debug;

use crate::errors::{HarnessError, ProviderError};
use crate::model::ProviderId;
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest, ProviderStreamHandle};

use super::config::OpenAiCompatConfig;
use super::transport::map_chat_frame_to_events;

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Provider adapter for any OpenAI-compatible streaming chat-completions API
/// (Groq, OpenAI, local proxies).
pub struct OpenAiCompatProvider {
    id: ProviderId,
    client: reqwest::Client,
    config: OpenAiCompatConfig,
}

impl OpenAiCompatProvider {
    /// Creates a provider registered under `id` from explicit configuration.
    pub fn new(id: impl Into<ProviderId>, config: OpenAiCompatConfig) -> Result<Self, HarnessError> {
        if config.api_key.trim().is_empty() {
            return Err(HarnessError::Config(
                "completion provider api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            id: id.into(),
            client,
            config,
        })
    }

    /// Creates a provider from the environment (see `OpenAiCompatConfig::from_env`).
    pub fn from_env(id: impl Into<ProviderId>) -> Result<Self, HarnessError> {
        Self::new(id, OpenAiCompatConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiCompatProvider {
    fn id(&self) -> ProviderId {
        self.id.clone()
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let provider_id = self.id.clone();
        let body = build_request_body(&req);
        debug!(relay_id = %req.relay_id, model = %req.model.model, "opening chat completion stream");

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ProviderError::transport(provider_id.clone(), format!("request failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderError::provider(
                provider_id,
                format!("chat completion request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(ProviderStreamHandle::new(Box::pin(chat_event_stream(
            provider_id,
            bytes_stream,
        ))))
    }
}

pub(crate) fn build_request_body(req: &ProviderRequest) -> serde_json::Value {
    serde_json::json!({
        "model": req.model.model,
        "messages": [{ "role": "user", "content": req.prompt }],
        "stream": true,
    })
}

fn chat_event_stream<S>(
    provider_id: ProviderId,
    bytes_stream: S,
) -> impl futures::Stream<Item = Result<ProviderEvent, ProviderError>> + Send
where
    S: futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    struct State<S> {
        provider_id: ProviderId,
        bytes_stream: S,
        decoder: SseDecoder,
        pending: VecDeque<ProviderEvent>,
        // Raised by a later frame of an already-decoded chunk; yielded once
        // the events before it are drained.
        failed: Option<ProviderError>,
        done: bool,
    }

    impl<S> State<S> {
        fn absorb(&mut self, frames: Vec<recipe_core::SseFrame>) {
            for frame in frames {
                match map_chat_frame_to_events(&self.provider_id, &frame) {
                    Ok(events) => self.pending.extend(events),
                    Err(err) => {
                        self.failed = Some(err);
                        return;
                    }
                }
            }
        }
    }

    stream::try_unfold(
        State {
            provider_id,
            bytes_stream,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            failed: None,
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if let Some(err) = state.failed.take() {
                    return Err(err);
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        let frames = state.decoder.push_chunk(&chunk);
                        state.absorb(frames);
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(
                            state.provider_id,
                            format!("streaming read failed: {e}"),
                        ));
                    }
                    None => {
                        let trailing = state.decoder.finish().into_iter().collect();
                        state.absorb(trailing);
                        state.done = true;
                    }
                }
            }
        },
    )
}
