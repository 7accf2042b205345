use serde::{Deserialize, Serialize};

/// Message sent to the client when the upstream provider cannot produce a recipe.
///
/// The detailed cause stays in the server log.
pub const UPSTREAM_FAILURE_MESSAGE: &str = "Failed to generate recipe. Please try again.";

/// Provider-agnostic event relayed to the client.
///
/// On the wire each event is one JSON object tagged by `action`:
/// `{"action":"chunk","chunk":"..."}`, `{"action":"close"}` or
/// `{"action":"error","message":"..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum StreamEvent {
    /// Incremental recipe text.
    Chunk {
        #[serde(rename = "chunk")]
        text: String,
    },
    /// Terminal success event.
    Close,
    /// Terminal failure event.
    Error { message: String },
}

impl StreamEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns true for `Close` and `Error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Close | Self::Error { .. })
    }

    /// Parses one SSE data payload.
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_matches_action_envelope() {
        assert_eq!(
            serde_json::to_string(&StreamEvent::chunk("Ch")).expect("serialize"),
            r#"{"action":"chunk","chunk":"Ch"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::Close).expect("serialize"),
            r#"{"action":"close"}"#
        );
        assert_eq!(
            serde_json::to_string(&StreamEvent::error("boom")).expect("serialize"),
            r#"{"action":"error","message":"boom"}"#
        );
    }

    #[test]
    fn parses_events_and_rejects_unknown_actions() {
        assert_eq!(
            StreamEvent::from_json(r#"{"action":"chunk","chunk":""}"#).expect("chunk"),
            StreamEvent::chunk("")
        );
        assert!(StreamEvent::from_json(r#"{"action":"close"}"#)
            .expect("close")
            .is_terminal());
        assert!(StreamEvent::from_json(r#"{"action":"restart"}"#).is_err());
        assert!(StreamEvent::from_json("not json").is_err());
    }
}
