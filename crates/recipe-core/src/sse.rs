//! Incremental Server-Sent Events frame decoder.
//!
//! Used both for the provider's chat-completion stream and for the relay's
//! own `/recipeStream` responses on the client side.

/// One decoded SSE frame. Multiple `data:` lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// True for the OpenAI-style `[DONE]` end-of-stream marker.
    pub fn is_done_marker(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Buffers raw bytes until complete frames are available.
///
/// Frames may be split across network chunks and one chunk may carry several
/// frames. Comment lines (`: keep-alive`) are skipped.
#[derive(Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    // Bytes before this offset are known to hold no delimiter start.
    scanned: usize,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every frame it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf, self.scanned) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            self.scanned = 0;
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        // A delimiter may straddle the next chunk, so keep its longest prefix.
        self.scanned = self.buf.len().saturating_sub(3);
        frames
    }

    /// Flushes a trailing frame left without its blank-line terminator.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_chunk(b"data: {\"action\":\"chunk\",\"chu");
        assert!(frames.is_empty());
        let frames = decoder.push_chunk(b"nk\":\"Ch\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, r#"{"action":"chunk","chunk":"Ch"}"#);
        assert_eq!(frames[0].event, None);
    }

    #[test]
    fn long_frame_fed_byte_by_byte_resumes_scanning() {
        let mut decoder = SseDecoder::new();
        let payload = format!("data: {}\r\n\r\ndata: tail\n\n", "x".repeat(4096));
        let mut frames = Vec::new();
        for byte in payload.as_bytes() {
            frames.extend(decoder.push_chunk(std::slice::from_ref(byte)));
            assert!(decoder.scanned <= decoder.buf.len());
        }
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data.len(), 4096);
        assert_eq!(frames[1].data, "tail");
        assert!(decoder.buf.is_empty());
    }

    #[test]
    fn delimiter_split_across_chunks_is_found() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push_chunk(b"data: a\r\n").is_empty());
        assert!(decoder.push_chunk(b"\r").is_empty());
        let frames = decoder.push_chunk(b"\ndata: b\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "a");
        let frames = decoder.push_chunk(b"\n");
        assert_eq!(frames[0].data, "b");
    }

    #[test]
    fn emits_every_frame_in_one_chunk_and_skips_comments() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_chunk(b": keep-alive\n\ndata: a\r\n\r\nevent: message\ndata: b\ndata: c\n\n");
        assert_eq!(
            frames,
            vec![
                SseFrame {
                    event: None,
                    data: "a".into()
                },
                SseFrame {
                    event: Some("message".into()),
                    data: "b\nc".into()
                },
            ]
        );
    }

    #[test]
    fn recognizes_done_marker_and_trailing_frame() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push_chunk(b"data: [DONE]").is_empty());
        let frame = decoder.finish().expect("trailing frame");
        assert!(frame.is_done_marker());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn keeps_leading_whitespace_of_payload_beyond_the_separator() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push_chunk(b"data:  indented\n\n");
        assert_eq!(frames[0].data, " indented");
    }
}
