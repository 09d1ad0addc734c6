use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use tokio::time::{timeout_at, Instant};

use crate::chunk::{AgentStreamChunk, StreamEvent};
use crate::error::{Result, StreamError};
use crate::frame::SseFrame;
use crate::handle::{EventSink, StreamHandle};
use crate::sse_parser::parse_sse_frames;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8091";
const DEFAULT_API_PREFIX: &str = "/ai-agent-station/api/v1";
const CHAT_STREAM_PATH: &str = "/ai/agent/chat_stream";
const HANDLE_CAPACITY: usize = 256;

/// Parameters of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatStreamRequest {
    pub agent_id: String,
    pub rag_id: Option<String>,
    pub message: String,
}

impl ChatStreamRequest {
    /// Sent as `ragId` when no knowledge base is selected.
    pub const DEFAULT_RAG_ID: &'static str = "0";

    pub fn new(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            rag_id: None,
            message: message.into(),
        }
    }

    pub fn with_rag(mut self, rag_id: Option<String>) -> Self {
        self.rag_id = rag_id.filter(|id| !id.is_empty());
        self
    }

    pub fn query_pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("aiAgentId", self.agent_id.as_str()),
            ("ragId", self.rag_id.as_deref().unwrap_or(Self::DEFAULT_RAG_ID)),
            ("message", self.message.as_str()),
        ]
    }
}

/// Opens one server-push connection per chat turn.
///
/// `open` must return immediately; all network work happens behind the
/// returned handle.
pub trait ChatTransport: Send + Sync {
    fn open(&self, request: ChatStreamRequest) -> StreamHandle;
}

#[derive(Debug, Clone)]
pub struct SseTransportConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub stream_path: String,
    /// Applies from connection open until the first reply text arrives.
    pub connect_timeout: Duration,
}

impl SseTransportConfig {
    pub fn new(base_url: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: api_prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_stream_path(mut self, path: impl Into<String>) -> Self {
        self.stream_path = path.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}{}{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix,
            self.stream_path
        )
    }
}

impl Default for SseTransportConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            stream_path: CHAT_STREAM_PATH.to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// SSE transport over HTTP (reqwest). Must be used inside a tokio runtime.
pub struct SseTransport {
    http_client: reqwest::Client,
    config: SseTransportConfig,
}

impl SseTransport {
    pub fn new(config: SseTransportConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StreamError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client, config })
    }

    pub fn with_client(http_client: reqwest::Client, config: SseTransportConfig) -> Self {
        Self { http_client, config }
    }

    pub fn config(&self) -> &SseTransportConfig {
        &self.config
    }
}

impl ChatTransport for SseTransport {
    fn open(&self, request: ChatStreamRequest) -> StreamHandle {
        let (sink, mut handle) = StreamHandle::channel(HANDLE_CAPACITY);
        let http_client = self.http_client.clone();
        let url = self.config.endpoint();
        let connect_timeout = self.config.connect_timeout;
        let handle_id = handle.id();

        tracing::info!(handle_id, agent_id = %request.agent_id, "Opening chat stream");

        let task = tokio::spawn(async move {
            let connect = async move {
                let response = http_client
                    .get(&url)
                    .query(&request.query_pairs())
                    .send()
                    .await?;

                if !response.status().is_success() {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Err(StreamError::Http { status, body });
                }

                Ok(parse_sse_frames(response.bytes_stream()))
            };

            pump_frames(sink, connect, connect_timeout).await;
            tracing::debug!(handle_id, "Chat stream task finished");
        });
        handle.attach_task(task.abort_handle());

        handle
    }
}

/// Drive a frame stream into a sink until a terminal event.
///
/// `first_frame_timeout` covers both `connect` and the wait for the first
/// reply text; skipped frames and empty deltas do not count. Once text has
/// arrived there is no deadline. A stream that ends without a finish signal
/// is reported as a connection failure.
pub async fn pump_frames<C, S>(mut sink: EventSink, connect: C, first_frame_timeout: Duration)
where
    C: Future<Output = Result<S>>,
    S: Stream<Item = Result<SseFrame>> + Unpin,
{
    let deadline = Instant::now() + first_frame_timeout;
    let timed_out = StreamError::Timeout { after: first_frame_timeout };

    let mut frames = match timeout_at(deadline, connect).await {
        Ok(Ok(frames)) => frames,
        Ok(Err(e)) => {
            sink.fail(e).await;
            return;
        }
        Err(_) => {
            sink.fail(timed_out.clone()).await;
            return;
        }
    };

    let mut awaiting_first_text = true;
    loop {
        let next = if awaiting_first_text {
            match timeout_at(deadline, frames.next()).await {
                Ok(next) => next,
                Err(_) => {
                    sink.fail(timed_out.clone()).await;
                    return;
                }
            }
        } else {
            frames.next().await
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => {
                sink.fail(e).await;
                return;
            }
            None => {
                sink.fail(StreamError::Connection(
                    "Stream closed before finish signal".to_string(),
                ))
                .await;
                return;
            }
        };

        if !frame.is_message() {
            tracing::debug!(event = frame.event_type(), "Skipping non-message frame");
            continue;
        }
        tracing::debug!(bytes = frame.data.len(), "Received chat frame");

        let events = match AgentStreamChunk::parse(&frame.data).and_then(|c| c.to_stream_events()) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed chat frame");
                sink.fail(e).await;
                return;
            }
        };

        for event in events {
            match event {
                StreamEvent::TextDelta { content } => {
                    if !sink.delta(content).await {
                        return;
                    }
                    awaiting_first_text = false;
                }
                StreamEvent::Done { .. } => {
                    sink.done().await;
                    return;
                }
            }
        }
    }
}
