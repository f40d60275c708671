//! Incremental frame parser for the council event stream.
//!
//! Frames are blank-line separated blocks of `event:` and `data:` lines.
//! Bytes are buffered until a separator arrives, so chunk boundaries may fall
//! anywhere, including inside a multi-byte character.

use tracing::debug;

/// One complete protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Value of the `event:` line.
    pub event: String,
    /// Value of the `data:` line(s), joined with `\n`.
    pub data: String,
}

/// Rolling buffer that turns arbitrary chunks into frames.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: Vec<u8>,
    /// Position from which the next separator search starts.
    scan_from: usize,
}

impl FrameParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, separator_len)) = find_separator(&self.buffer, self.scan_from) {
            let block: Vec<u8> = self.buffer.drain(..end + separator_len).collect();
            self.scan_from = 0;
            match parse_block(&block[..end]) {
                Some(frame) => frames.push(frame),
                None => debug!(bytes = end, "Dropping frame without event and data lines"),
            }
        }

        // A separator is at most 3 bytes; its first byte may sit in the
        // previous chunk's tail.
        self.scan_from = self.buffer.len().saturating_sub(2);
        frames
    }

    /// Bytes waiting for a separator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// End of stream. The incomplete remainder is never emitted; it is
    /// returned (lossily decoded) when it holds anything but whitespace.
    pub fn finish(self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buffer);
        if rest.trim().is_empty() {
            None
        } else {
            Some(rest.into_owned())
        }
    }
}

/// Find a blank line at or after `from`: `\n\n` or `\n\r\n`.
/// Returns the offset of the first newline and the separator length.
fn find_separator(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i < buffer.len() {
        if buffer[i] == b'\n' {
            match (buffer.get(i + 1), buffer.get(i + 2)) {
                (Some(b'\n'), _) => return Some((i, 2)),
                (Some(b'\r'), Some(b'\n')) => return Some((i, 3)),
                _ => {}
            }
        }
        i += 1;
    }
    None
}

fn parse_block(block: &[u8]) -> Option<Frame> {
    let text = String::from_utf8_lossy(block);
    let mut event: Option<String> = None;
    let mut data: Option<Vec<&str>> = None;

    for line in text.lines() {
        if line.starts_with(':') {
            continue;
        }
        if let Some(value) = line.strip_prefix("event:") {
            if event.is_none() {
                event = Some(value.trim().to_string());
            }
        } else if let Some(value) = line.strip_prefix("data:") {
            data.get_or_insert_with(Vec::new).push(value.trim());
        }
    }

    Some(Frame {
        event: event?,
        data: data?.join("\n"),
    })
}
