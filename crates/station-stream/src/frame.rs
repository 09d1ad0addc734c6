use std::collections::VecDeque;

use crate::error::{Result, StreamError};

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseFrame {
    /// Frames without an `event:` field are plain `message` events.
    pub fn event_type(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    pub fn is_message(&self) -> bool {
        self.event_type() == "message"
    }
}

#[derive(Default)]
struct PendingFrame {
    event: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl PendingFrame {
    fn take(&mut self) -> Option<SseFrame> {
        let pending = std::mem::take(self);
        if pending.data_lines.is_empty() {
            // No data field: per SSE rules nothing is dispatched
            return None;
        }
        Some(SseFrame {
            event: pending.event,
            data: pending.data_lines.join("\n"),
            id: pending.id,
        })
    }
}

/// Byte buffer that reassembles SSE frames across arbitrary chunk boundaries.
///
/// Lines are split on `\n` (a trailing `\r` is dropped) and a blank line
/// dispatches whatever fields were collected since the previous one.
pub struct FrameBuffer {
    buffer: VecDeque<u8>,
    pending: PendingFrame,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            pending: PendingFrame::default(),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Pull the next complete frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Option<Result<SseFrame>> {
        loop {
            let line = match self.next_line()? {
                Ok(line) => line,
                Err(e) => {
                    self.pending = PendingFrame::default();
                    return Some(Err(e));
                }
            };

            if line.is_empty() {
                if let Some(frame) = self.pending.take() {
                    return Some(Ok(frame));
                }
                continue;
            }

            self.apply_line(&line);
        }
    }

    /// Bytes still waiting for a line terminator.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
        line_bytes.pop();
        if line_bytes.last() == Some(&b'\r') {
            line_bytes.pop();
        }

        match String::from_utf8(line_bytes) {
            Ok(line) => Some(Ok(line)),
            Err(e) => Some(Err(StreamError::Protocol(format!("Invalid UTF-8 in frame: {}", e)))),
        }
    }

    fn apply_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.pending.data_lines.push(value.to_string()),
            "event" => self.pending.event = Some(value.to_string()),
            "id" => self.pending.id = Some(value.to_string()),
            _ => {}
        }
    }
}
