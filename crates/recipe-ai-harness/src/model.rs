use std::fmt;
use std::time::Duration;

/// Stable identifier for a provider implementation (for example `groq`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    /// Creates a provider id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the provider id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Model selection for a relay.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModelRef {
    /// Provider that owns the model.
    pub provider: ProviderId,
    /// Provider-specific model name (for example `llama-3.1-8b-instant`).
    pub model: String,
}

impl ModelRef {
    /// Creates a model reference.
    pub fn new(provider: impl Into<ProviderId>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

/// Per-relay behavior options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayOptions {
    /// Longest wait for the provider to open the stream or send the next
    /// fragment. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Bounded event buffer size between the relay task and the consumer.
    pub stream_buffer_capacity: usize,
    /// Forward fragments with empty text as empty chunks instead of dropping them.
    pub forward_empty_fragments: bool,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(120)),
            stream_buffer_capacity: 128,
            forward_empty_fragments: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_options_defaults() {
        let options = RelayOptions::default();
        assert_eq!(options.stream_buffer_capacity, 128);
        assert_eq!(options.idle_timeout, Some(Duration::from_secs(120)));
        assert!(options.forward_empty_fragments);
    }

    #[test]
    fn provider_id_display_and_conversions() {
        let id: ProviderId = "groq".into();
        assert_eq!(id.to_string(), "groq");
        assert_eq!(ModelRef::new("groq", "m").provider, id);
    }
}
