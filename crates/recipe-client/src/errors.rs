/// Failures while reading the relay's event stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsumerError {
    /// The server was unreachable, answered with a non-2xx status, or the
    /// connection dropped mid-stream.
    #[error("transport error: {0}")]
    Transport(String),
    /// A `data:` payload was not a valid stream event.
    #[error("malformed stream event: {0}")]
    Malformed(String),
}
