pub mod chunk;
pub mod error;
pub mod frame;
pub mod handle;
pub mod sse_parser;
pub mod transport;

pub use chunk::{AgentStreamChunk, StreamEvent, FINISH_REASON_STOP};
pub use error::{FailureKind, Result, StreamError};
pub use frame::{FrameBuffer, SseFrame};
pub use handle::{EventSink, StreamHandle, TransportEvent};
pub use sse_parser::parse_sse_frames;
pub use transport::{pump_frames, ChatStreamRequest, ChatTransport, SseTransport, SseTransportConfig};
