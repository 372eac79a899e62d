// crates/client/src/sse.rs
//! Incremental `text/event-stream` frame decoder.
//!
//! Feeds arbitrary byte chunks in, yields the `data` payload of each
//! complete event out. Events are delimited by a blank line; `data:` lines
//! within one event are joined with `\n`. Comment lines (leading `:`) and
//! fields this client does not use (`event:`, `id:`, `retry:`) are skipped.
//! Chunk boundaries may fall anywhere, including inside a UTF-8 sequence —
//! the buffer is only decoded at frame boundaries.

use memchr::memmem;

#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete event's data payload.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        loop {
            let Some((frame_end, delim_len)) = self.find_frame_end() else {
                break;
            };
            let frame: Vec<u8> = self.buf.drain(..frame_end + delim_len).collect();
            let text = String::from_utf8_lossy(&frame[..frame_end]);
            if let Some(data) = Self::parse_frame(&text) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Find the earliest blank-line delimiter (`\n\n` or `\r\n\r\n`).
    fn find_frame_end(&self) -> Option<(usize, usize)> {
        let lf = memmem::find(&self.buf, b"\n\n").map(|i| (i, 2));
        let crlf = memmem::find(&self.buf, b"\r\n\r\n").map(|i| (i, 4));
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if b.0 < a.0 { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    fn parse_frame(frame: &str) -> Option<String> {
        let mut data_lines = Vec::new();
        for line in frame.lines() {
            if line.starts_with(':') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("data:") {
                data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
            }
        }
        if data_lines.is_empty() {
            None
        } else {
            Some(data_lines.join("\n"))
        }
    }
}
