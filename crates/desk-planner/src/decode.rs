//! Incremental framing of plan byte streams into messages

use crate::error::{PlanError, Result};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;

/// Splits bytes into lines, tolerating chunks that end mid-line or mid-character
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            lines.push(line.strip_suffix('\r').unwrap_or(&*line).to_string());
        }
        lines
    }

    fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
        Some(rest.strip_suffix('\r').unwrap_or(&rest).to_string())
    }
}

/// Server-sent events decoder
///
/// Joins the `data:` lines of an event with `\n` and emits the result on the
/// blank line that ends the event. Comments and other fields are skipped. An
/// event still open when the stream ends is discarded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    lines: LineBuffer,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut events = Vec::new();
        for line in self.lines.push(chunk) {
            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(self.data.join("\n"));
                    self.data.clear();
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_str(), ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        events
    }

    /// Drop whatever is left of an unterminated event
    pub fn finish(&mut self) {
        if !self.data.is_empty() {
            tracing::debug!(lines = self.data.len(), "discarding unterminated SSE event");
        }
        self.data.clear();
        self.lines.take_rest();
    }
}

/// Newline-delimited JSON decoder
#[derive(Debug, Default)]
pub struct JsonLinesDecoder {
    lines: LineBuffer,
}

impl JsonLinesDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.lines
            .push(chunk)
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    pub fn finish(&mut self) -> Option<String> {
        self.lines.take_rest().filter(|rest| !rest.trim().is_empty())
    }
}

/// Framing of a plan byte stream
#[derive(Debug)]
pub enum Decoder {
    Sse(SseDecoder),
    JsonLines(JsonLinesDecoder),
}

impl Decoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        match self {
            Self::Sse(decoder) => decoder.push(chunk),
            Self::JsonLines(decoder) => decoder.push(chunk),
        }
    }

    pub fn finish(&mut self) -> Option<String> {
        match self {
            Self::Sse(decoder) => {
                decoder.finish();
                None
            },
            Self::JsonLines(decoder) => decoder.finish(),
        }
    }
}

struct FrameState<B> {
    bytes: BoxStream<'static, Result<B>>,
    decoder: Decoder,
    ready: VecDeque<String>,
    done: bool,
}

/// Turn a byte stream into a stream of message payloads
///
/// The first transport error is yielded and ends the stream.
pub fn frames<S, B, E>(bytes: S, decoder: Decoder) -> BoxStream<'static, Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<PlanError> + Send + 'static,
{
    let state = FrameState {
        bytes: bytes.map(|chunk| chunk.map_err(Into::into)).boxed(),
        decoder,
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(message) = state.ready.pop_front() {
                return Some((Ok(message), state));
            }
            if state.done {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let messages = state.decoder.push(chunk.as_ref());
                    state.ready.extend(messages);
                },
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                },
                None => {
                    state.done = true;
                    state.ready.extend(state.decoder.finish());
                },
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_events_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: Planner started\n").is_empty());
        assert_eq!(decoder.push(b"\ndata: {\"type\":"), vec!["Planner started".to_string()]);
        let events = decoder.push(b"\"step\"}\r\n\r\n");
        assert_eq!(events, vec![r#"{"type":"step"}"#.to_string()]);
    }

    #[test]
    fn test_sse_first_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: Planner started\n\n");
        assert_eq!(events, vec!["Planner started".to_string()]);
    }

    #[test]
    fn test_sse_multiline_comments_and_fields() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b": keepalive\nevent: message\nid: 7\ndata:first\ndata: second\nretry: 10\n\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn test_sse_split_utf8() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: café\n\n".as_bytes();
        let (head, tail) = bytes.split_at(10);
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["café".to_string()]);
    }

    #[test]
    fn test_sse_unterminated_event_dropped() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":\"final\"}\n").is_empty());
        decoder.finish();
        assert!(decoder.push(b"\n").is_empty());
    }

    #[test]
    fn test_json_lines() {
        let mut decoder = JsonLinesDecoder::new();
        let lines = decoder.push(b"{\"type\":\"status\"}\n\n{\"type\":");
        assert_eq!(lines, vec![r#"{"type":"status"}"#.to_string()]);
        assert!(decoder.push(b"\"final\"}").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some(r#"{"type":"final"}"#));
    }

    #[tokio::test]
    async fn test_frames_stream() {
        let chunks: Vec<std::result::Result<&'static [u8], PlanError>> =
            vec![
            Ok(&b"data: a\n\nda"[..]),
            Ok(&b"ta: b\n\n"[..]),
            Err(PlanError::Incomplete),
            Ok(&b"data: c\n\n"[..]),
        ];
        let messages: Vec<_> = frames(stream::iter(chunks), Decoder::Sse(SseDecoder::new())).collect().await;

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].as_ref().unwrap(), "a");
        assert_eq!(messages[1].as_ref().unwrap(), "b");
        assert!(matches!(messages[2], Err(PlanError::Incomplete)));
    }

    #[tokio::test]
    async fn test_frames_flushes_json_tail() {
        let chunks: Vec<std::result::Result<Vec<u8>, PlanError>> = vec![Ok(b"{\"a\":1}\n{\"b\":2}".to_vec())];
        let messages: Vec<String> = frames(stream::iter(chunks), Decoder::JsonLines(JsonLinesDecoder::new()))
            .map(|m| m.unwrap())
            .collect()
            .await;
        assert_eq!(messages, vec![r#"{"a":1}"#.to_string(), r#"{"b":2}"#.to_string()]);
    }
}
