use recipe_core::SseFrame;

use crate::errors::ProviderError;
use crate::model::ProviderId;
use crate::provider::ProviderEvent;

/// Maps one SSE frame of a chat-completions stream to provider events.
///
/// Every JSON frame yields exactly one `TextDelta`, with empty text when the
/// frame carries no content (role preamble, finish frame, usage frame).
pub(crate) fn map_chat_frame_to_events(
    provider: &ProviderId,
    frame: &SseFrame,
) -> Result<Vec<ProviderEvent>, ProviderError> {
    if frame.is_done_marker() {
        return Ok(vec![ProviderEvent::Completed]);
    }
    if frame.data.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(&frame.data).map_err(|e| {
        ProviderError::protocol(provider.clone(), format!("invalid SSE JSON frame: {e}"))
    })?;
    map_chat_json_to_events(provider, &value)
}

pub(crate) fn map_chat_json_to_events(
    provider: &ProviderId,
    value: &serde_json::Value,
) -> Result<Vec<ProviderEvent>, ProviderError> {
    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .or_else(|| err.as_str())
            .unwrap_or("chat completion stream error");
        return Err(ProviderError::provider(provider.clone(), message, None));
    }
    let text = value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(|content| content.as_str())
        .unwrap_or_default();
    Ok(vec![ProviderEvent::TextDelta {
        text: text.to_string(),
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::SseDecoder;

    fn frame(data: &str) -> SseFrame {
        SseFrame {
            event: None,
            data: data.to_string(),
        }
    }

    #[test]
    fn maps_delta_content_and_done_marker() {
        let provider = ProviderId::new("groq");
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_chunk(
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n\
              data: {\"choices\":[{\"delta\":{\"content\":\"# Chicken\"}}]}\n\n\
              data: [DONE]\n\n",
        );
        let events: Vec<ProviderEvent> = frames
            .iter()
            .flat_map(|f| map_chat_frame_to_events(&provider, f).expect("map"))
            .collect();
        assert_eq!(
            events,
            vec![
                ProviderEvent::TextDelta { text: "".into() },
                ProviderEvent::TextDelta {
                    text: "# Chicken".into()
                },
                ProviderEvent::Completed,
            ]
        );
    }

    #[test]
    fn frames_without_choices_become_empty_fragments() {
        let provider = ProviderId::new("groq");
        let events = map_chat_frame_to_events(
            &provider,
            &frame(r#"{"choices":[],"x_groq":{"usage":{"total_tokens":12}}}"#),
        )
        .expect("map");
        assert_eq!(events, vec![ProviderEvent::TextDelta { text: "".into() }]);
    }

    #[test]
    fn error_frame_is_provider_error() {
        let provider = ProviderId::new("groq");
        let err = map_chat_frame_to_events(
            &provider,
            &frame(r#"{"error":{"message":"rate limit reached"}}"#),
        )
        .expect_err("should fail");
        assert!(matches!(err, ProviderError::Provider { ref message, .. } if message == "rate limit reached"));
    }

    #[test]
    fn non_json_frame_is_protocol_error() {
        let provider = ProviderId::new("groq");
        let err = map_chat_frame_to_events(&provider, &frame("<html>")).expect_err("should fail");
        assert!(matches!(err, ProviderError::Protocol { .. }));
    }
}
