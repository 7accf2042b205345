use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures::{Stream, StreamExt as _, stream};
use recipe_core::{RecipeRequest, SseDecoder, SseFrame, StreamEvent};
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::errors::ConsumerError;

/// Events of one open `/recipeStream` connection. Dropping it closes the
/// connection.
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, ConsumerError>> + Send + 'static>>;

/// Opens event streams for recipe requests.
#[async_trait::async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, request: &RecipeRequest) -> Result<EventStream, ConsumerError>;
}

/// Connects to a running relay over HTTP.
#[derive(Clone, Debug)]
pub struct HttpConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConnector {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConsumerError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConsumerError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub(crate) fn stream_url(&self) -> String {
        format!("{}/recipeStream", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl StreamConnector for HttpConnector {
    async fn connect(&self, request: &RecipeRequest) -> Result<EventStream, ConsumerError> {
        let url = self.stream_url();
        debug!(%url, "opening recipe stream");
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .query(&request.to_query_pairs())
            .send()
            .await
            .map_err(|e| ConsumerError::Transport(format!("request to {url} failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::Transport(format!(
                "{url} answered with status {status}"
            )));
        }
        Ok(Box::pin(decode_events(Box::pin(response.bytes_stream()))))
    }
}

/// Decodes an SSE byte stream into stream events. The first error ends it.
pub(crate) fn decode_events<S, E>(
    bytes_stream: S,
) -> impl Stream<Item = Result<StreamEvent, ConsumerError>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Send + Unpin + 'static,
    E: Display + Send + 'static,
{
    struct State<S> {
        bytes_stream: S,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    let event = StreamEvent::from_json(&frame.data).map_err(|e| {
                        ConsumerError::Malformed(format!("{e} in {:?}", frame.data))
                    })?;
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }
                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => state.pending.extend(state.decoder.push_chunk(&chunk)),
                    Some(Err(e)) => {
                        return Err(ConsumerError::Transport(format!("stream read failed: {e}")));
                    }
                    None => {
                        state.pending.extend(state.decoder.finish());
                        state.done = true;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    type ByteChunks = stream::Iter<std::vec::IntoIter<Result<bytes::Bytes, String>>>;

    fn byte_chunks(chunks: &[&'static str]) -> ByteChunks {
        stream::iter(
            chunks
                .iter()
                .map(|c| Ok(bytes::Bytes::from_static(c.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn decodes_events_split_across_chunks_and_skips_keep_alives() {
        let events: Vec<_> = decode_events(byte_chunks(&[
            "data: {\"action\":\"chunk\",\"chunk\":\"Ch\"}\n\n:\n\ndata: {\"action\":\"ch",
            "unk\",\"chunk\":\"icken \"}\n\ndata: {\"action\":\"chunk\",\"chunk\":\"Soup\"}\n\n",
            "data: {\"action\":\"close\"}\n\n",
        ]))
        .collect()
        .await;
        assert_eq!(
            events,
            vec![
                Ok(StreamEvent::chunk("Ch")),
                Ok(StreamEvent::chunk("icken ")),
                Ok(StreamEvent::chunk("Soup")),
                Ok(StreamEvent::Close),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_payload_ends_the_stream() {
        let events: Vec<_> = decode_events(byte_chunks(&[
            "data: {\"action\":\"chunk\",\"chunk\":\"a\"}\n\ndata: not json\n\ndata: {\"action\":\"close\"}\n\n",
        ]))
        .collect()
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok(StreamEvent::chunk("a")));
        assert!(matches!(events[1], Err(ConsumerError::Malformed(_))));
    }

    #[tokio::test]
    async fn read_failure_is_a_transport_error() {
        let chunks: Vec<Result<bytes::Bytes, String>> = vec![
            Ok(bytes::Bytes::from_static(b"data: {\"action\":\"chunk\",\"chunk\":\"a\"}\n\n")),
            Err("connection reset".to_string()),
        ];
        let events: Vec<_> = decode_events(stream::iter(chunks)).collect().await;
        assert_eq!(events.len(), 2);
        assert!(
            matches!(&events[1], Err(ConsumerError::Transport(message)) if message.contains("connection reset"))
        );
    }

    #[tokio::test]
    async fn trailing_frame_without_blank_line_is_flushed() {
        let events: Vec<_> = decode_events(byte_chunks(&["data: {\"action\":\"close\"}"]))
            .collect()
            .await;
        assert_eq!(events, vec![Ok(StreamEvent::Close)]);
    }

    #[test]
    fn stream_url_tolerates_trailing_slash() {
        let connector = HttpConnector::new("http://localhost:3001/").expect("connector");
        assert_eq!(connector.stream_url(), "http://localhost:3001/recipeStream");
    }
}
