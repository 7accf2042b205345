use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use recipe_core::{StreamEvent, UPSTREAM_FAILURE_MESSAGE};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

use crate::errors::{HarnessError, RelayFailure};
use crate::harness::ProviderRegistry;
use crate::model::{ModelRef, ProviderId, RelayOptions};
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderRequest};

/// Handle used to stop a running relay.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The provider stream is released and, if the consumer is still
    /// listening, a single terminal `StreamEvent::Error` is delivered.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Builder for one prompt-to-stream relay.
pub struct RelayBuilder {
    harness: Arc<ProviderRegistry>,
    model: ModelRef,
    prompt: Option<String>,
    options: RelayOptions,
}

impl RelayBuilder {
    pub(crate) fn new(harness: Arc<ProviderRegistry>, model: ModelRef) -> Self {
        Self {
            harness,
            model,
            prompt: None,
            options: RelayOptions::default(),
        }
    }

    /// Sets the prompt sent to the model as a single user message.
    pub fn prompt(mut self, text: impl Into<String>) -> Self {
        self.prompt = Some(text.into());
        self
    }

    /// Replaces all relay options.
    pub fn options(mut self, options: RelayOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the idle timeout. `None` waits on the provider forever.
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.options.idle_timeout = timeout;
        self
    }

    /// Sets the bounded buffer size between the relay task and the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Chooses whether empty provider fragments become empty chunks.
    pub fn forward_empty_fragments(mut self, forward: bool) -> Self {
        self.options.forward_empty_fragments = forward;
        self
    }

    /// Validates the builder and spawns the relay task.
    ///
    /// The returned `RelayStream` yields `Chunk` events in provider order and
    /// then exactly one `Close` or `Error`.
    pub async fn start_stream(self) -> Result<RelayStream, HarnessError> {
        let (provider, request, options) = self.validate()?;

        let (tx, rx) = mpsc::channel(options.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (abort_tx, abort_rx) = watch::channel(false);

        let relay_id = request.relay_id;
        let model = request.model.clone();
        debug!(relay_id = %relay_id, provider = %model.provider, model = %model.model, "starting relay");
        tokio::spawn(relay_task(provider, request, options, tx, final_tx, abort_rx));

        Ok(RelayStream {
            relay_id,
            provider: model.provider,
            model: model.model,
            rx,
            final_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            terminated: false,
        })
    }

    /// Runs to completion and returns the concatenated recipe text.
    pub async fn collect_text(self) -> Result<String, HarnessError> {
        self.start_stream().await?.finish().await
    }

    fn validate(
        self,
    ) -> Result<(Arc<dyn ProviderAdapter>, ProviderRequest, RelayOptions), HarnessError> {
        if self.model.provider.as_str().trim().is_empty() {
            return Err(HarnessError::Validation(
                "model provider must not be empty".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(HarnessError::Validation("model must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(HarnessError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        let Some(prompt) = self.prompt.filter(|p| !p.trim().is_empty()) else {
            return Err(HarnessError::Validation("prompt must not be empty".into()));
        };
        let provider = self.harness.provider(&self.model.provider).ok_or_else(|| {
            HarnessError::ProviderNotFound {
                provider: self.model.provider.clone(),
            }
        })?;

        let request = ProviderRequest {
            relay_id: uuid::Uuid::new_v4(),
            model: self.model,
            prompt,
        };
        Ok((provider, request, self.options))
    }
}

/// Consumer side of a running relay.
///
/// Dropping it is how a client disconnect propagates: the relay task notices
/// the closed channel, releases the provider stream and sends nothing more.
pub struct RelayStream {
    relay_id: uuid::Uuid,
    provider: ProviderId,
    model: String,
    rx: mpsc::Receiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<String, HarnessError>>,
    abort_handle: AbortHandle,
    terminated: bool,
}

impl RelayStream {
    /// Returns the relay id used in log fields.
    pub fn relay_id(&self) -> uuid::Uuid {
        self.relay_id
    }

    /// Returns a handle that can stop the relay.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// True once the terminal event has been returned.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Waits for the next event.
    ///
    /// Returns `None` after the terminal event. If the relay task vanishes
    /// without a terminal event an `Error` is synthesized so consumers always
    /// see exactly one.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.terminated {
            return None;
        }
        match self.rx.recv().await {
            Some(event) => {
                if event.is_terminal() {
                    self.terminated = true;
                }
                Some(event)
            }
            None => {
                self.terminated = true;
                error!(relay_id = %self.relay_id, provider = %self.provider, model = %self.model, "relay task ended without a terminal event");
                Some(StreamEvent::error(UPSTREAM_FAILURE_MESSAGE))
            }
        }
    }

    /// Turns the relay into a `Stream` of events ending after the terminal one.
    pub fn into_event_stream(self) -> impl futures::Stream<Item = StreamEvent> + Send + 'static {
        futures::stream::unfold(self, |mut relay| async move {
            relay.next_event().await.map(|event| (event, relay))
        })
    }

    /// Drains the stream (if needed) and returns the concatenated text or the
    /// detailed failure.
    pub async fn finish(mut self) -> Result<String, HarnessError> {
        while self.next_event().await.is_some() {}

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::protocol_msg(format!(
                "relay task ended without final result (provider={}, model={})",
                self.provider, self.model
            ))),
        }
    }
}

async fn relay_task(
    provider: Arc<dyn ProviderAdapter>,
    request: ProviderRequest,
    options: RelayOptions,
    tx: mpsc::Sender<StreamEvent>,
    final_tx: oneshot::Sender<Result<String, HarnessError>>,
    mut abort_rx: watch::Receiver<bool>,
) {
    let ctx = RelayContext {
        relay_id: request.relay_id,
        provider_id: request.model.provider.clone(),
        model: request.model.model.clone(),
        tx,
        final_tx,
    };

    let opened = tokio::select! {
        biased;
        _ = ctx.tx.closed() => {
            ctx.disconnected();
            return;
        }
        _ = wait_for_abort(&mut abort_rx) => {
            ctx.aborted();
            return;
        }
        opened = within(options.idle_timeout, provider.start_stream(request)) => opened,
    };

    let mut handle = match opened {
        Ok(Ok(handle)) => handle,
        Ok(Err(err)) => {
            ctx.fail(RelayFailure::from(&err)).await;
            return;
        }
        Err(limit) => {
            ctx.fail(RelayFailure::Timeout(limit)).await;
            return;
        }
    };
    info!(relay_id = %ctx.relay_id, provider = %ctx.provider_id, model = %ctx.model, "provider stream opened");

    let mut text = String::new();
    let mut seq = 0_u64;
    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.tx.closed() => {
                drop(handle);
                ctx.disconnected();
                return;
            }
            _ = wait_for_abort(&mut abort_rx) => {
                drop(handle);
                ctx.aborted();
                return;
            }
            next = within(options.idle_timeout, handle.stream.next()) => next,
        };

        match next {
            Ok(Some(Ok(ProviderEvent::TextDelta { text: fragment }))) => {
                if fragment.is_empty() && !options.forward_empty_fragments {
                    continue;
                }
                debug!(relay_id = %ctx.relay_id, seq, len = fragment.len(), "forwarding fragment");
                text.push_str(&fragment);
                seq = seq.saturating_add(1);
                let sent = tokio::select! {
                    biased;
                    _ = wait_for_abort(&mut abort_rx) => {
                        drop(handle);
                        ctx.aborted();
                        return;
                    }
                    sent = ctx.tx.send(StreamEvent::chunk(fragment)) => sent,
                };
                if sent.is_err() {
                    drop(handle);
                    ctx.disconnected();
                    return;
                }
            }
            Ok(Some(Ok(ProviderEvent::Completed)) | None) => {
                drop(handle);
                info!(relay_id = %ctx.relay_id, fragments = seq, chars = text.len(), "relay completed");
                let sent = ctx.tx.send(StreamEvent::Close).await.is_ok();
                let _ = ctx.final_tx.send(if sent {
                    Ok(text)
                } else {
                    Err(HarnessError::RelayFailed(RelayFailure::Cancelled))
                });
                return;
            }
            Ok(Some(Err(err))) => {
                drop(handle);
                ctx.fail(RelayFailure::from(&err)).await;
                return;
            }
            Err(limit) => {
                drop(handle);
                ctx.fail(RelayFailure::Timeout(limit)).await;
                return;
            }
        }
    }
}

struct RelayContext {
    relay_id: uuid::Uuid,
    provider_id: ProviderId,
    model: String,
    tx: mpsc::Sender<StreamEvent>,
    final_tx: oneshot::Sender<Result<String, HarnessError>>,
}

impl RelayContext {
    async fn fail(self, failure: RelayFailure) {
        error!(relay_id = %self.relay_id, provider = %self.provider_id, model = %self.model, error = %failure, "relay failed");
        let _ = self
            .tx
            .send(StreamEvent::error(UPSTREAM_FAILURE_MESSAGE))
            .await;
        let _ = self.final_tx.send(Err(HarnessError::RelayFailed(failure)));
    }

    fn disconnected(self) {
        info!(relay_id = %self.relay_id, "client disconnected, provider stream released");
        let _ = self
            .final_tx
            .send(Err(HarnessError::RelayFailed(RelayFailure::Cancelled)));
    }

    fn aborted(self) {
        info!(relay_id = %self.relay_id, "relay aborted, provider stream released");
        // The consumer may not be reading, so never wait for buffer space here.
        let _ = self
            .tx
            .try_send(StreamEvent::error(UPSTREAM_FAILURE_MESSAGE));
        let _ = self
            .final_tx
            .send(Err(HarnessError::RelayFailed(RelayFailure::Cancelled)));
    }
}

async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output, Duration> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| limit),
        None => Ok(fut.await),
    }
}

async fn wait_for_abort(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Every AbortHandle is gone; only channel closure can stop us now.
            std::future::pending::<()>().await;
        }
    }
}
