use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Finish reason the backend sends on the last frame of a turn.
pub const FINISH_REASON_STOP: &str = "STOP";

/// Decoded content of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    TextDelta {
        content: String,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStreamChunk {
    pub result: Option<ChunkResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkResult {
    pub output: Option<ChunkOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkOutput {
    pub text: Option<String>,
    pub metadata: Option<OutputMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    pub finish_reason: Option<String>,
}

impl AgentStreamChunk {
    /// Parse the `data` payload of a frame.
    pub fn parse(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| StreamError::Protocol(format!("Failed to parse chunk: {}", e)))
    }

    fn output(&self) -> Option<&ChunkOutput> {
        self.result.as_ref().and_then(|r| r.output.as_ref())
    }

    pub fn text(&self) -> Option<&str> {
        self.output().and_then(|o| o.text.as_deref())
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.output()
            .and_then(|o| o.metadata.as_ref())
            .and_then(|m| m.finish_reason.as_deref())
    }

    pub fn is_done(&self) -> bool {
        self.finish_reason() == Some(FINISH_REASON_STOP)
    }

    /// Events carried by this chunk; a delta always comes before `Done`.
    ///
    /// A chunk without `result.output` is malformed. An empty delta with no
    /// finish signal yields nothing.
    pub fn to_stream_events(&self) -> Result<Vec<StreamEvent>> {
        if self.output().is_none() {
            return Err(StreamError::Protocol(
                "Server returned an empty or malformed response".to_string(),
            ));
        }

        let mut events = Vec::new();

        if let Some(text) = self.text() {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta {
                    content: text.to_string(),
                });
            }
        }

        if self.is_done() {
            events.push(StreamEvent::Done {
                finish_reason: self.finish_reason().map(str::to_string),
            });
        }

        Ok(events)
    }
}
