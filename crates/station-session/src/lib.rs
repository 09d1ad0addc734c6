pub mod config;
pub mod events;
pub mod session;
pub mod state;

pub use config::SessionConfig;
pub use events::{SessionEvent, TurnFailure, TurnOutcome};
pub use session::ChatSession;
pub use state::{StreamSession, StreamState};

pub use station_persist::{Conversation, ConversationEntry, ConversationId, HistoryStore, Message};
pub use station_stream::{ChatTransport, FailureKind, StreamError, TransportEvent};
