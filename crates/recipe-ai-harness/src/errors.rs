use std::time::Duration;

use crate::model::ProviderId;

/// Errors returned by a provider adapter before they are normalized into a
/// relay failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider returned an application-level failure (HTTP status, auth, etc.).
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },
    /// Transport or stream I/O failed.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// Provider response shape or event sequencing was invalid.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
}

impl ProviderError {
    /// Creates a provider-level error.
    pub fn provider(
        provider: impl Into<ProviderId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the provider associated with this error.
    pub fn provider_id(&self) -> &ProviderId {
        match self {
            Self::Provider { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Protocol { provider, .. } => provider,
        }
    }

    /// Returns the human-readable message for this error.
    pub fn message(&self) -> &str {
        match self {
            Self::Provider { message, .. }
            | Self::Transport { message, .. }
            | Self::Protocol { message, .. } => message,
        }
    }
}

/// Detailed cause behind a relay's terminal `Error` event.
///
/// Clients only ever see the generic upstream failure message; this value is
/// logged and returned from `RelayStream::finish`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayFailure {
    #[error("provider failure ({provider}): {message}")]
    Provider { provider: String, message: String },
    #[error("transport failure ({provider}): {message}")]
    Transport { provider: String, message: String },
    #[error("protocol failure: {message}")]
    Protocol { message: String },
    /// The provider stayed silent longer than the configured idle timeout.
    #[error("provider idle for more than {0:?}")]
    Timeout(Duration),
    /// The relay was aborted or its consumer went away.
    #[error("relay cancelled")]
    Cancelled,
}

/// Top-level error type for the public harness API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    /// Invalid harness/provider configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid input to the relay builder.
    #[error("validation error: {0}")]
    Validation(String),
    /// Requested provider is not registered in the harness.
    #[error("provider not found: {provider}")]
    ProviderNotFound { provider: ProviderId },
    /// Terminal failure returned from a started relay.
    #[error(transparent)]
    RelayFailed(RelayFailure),
    /// Internal protocol misuse or invariant violation.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl HarnessError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<RelayFailure> for HarnessError {
    fn from(value: RelayFailure) -> Self {
        HarnessError::RelayFailed(value)
    }
}

impl From<&ProviderError> for RelayFailure {
    fn from(err: &ProviderError) -> Self {
        match err {
            ProviderError::Provider {
                provider, message, ..
            } => RelayFailure::Provider {
                provider: provider.to_string(),
                message: message.clone(),
            },
            ProviderError::Transport { provider, message } => RelayFailure::Transport {
                provider: provider.to_string(),
                message: message.clone(),
            },
            ProviderError::Protocol { provider, message } => RelayFailure::Protocol {
                message: format!("provider={provider}: {message}"),
            },
        }
    }
}
