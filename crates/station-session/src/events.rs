use station_persist::{ConversationId, Message};
use station_stream::{FailureKind, StreamError};

/// State changes published to the render layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConversationCreated {
        id: ConversationId,
    },

    ConversationLoaded {
        id: ConversationId,
    },

    MessageAppended {
        id: ConversationId,
        message: Message,
    },

    ConversationRenamed {
        id: ConversationId,
        name: String,
    },

    ConversationDeleted {
        id: ConversationId,
    },

    HistoryCleared {
        removed: usize,
    },

    StreamStarted {
        id: ConversationId,
        stream_id: u64,
    },

    /// One incremental chunk; the running text is on the active stream session.
    PartialText {
        id: ConversationId,
        stream_id: u64,
        chunk: String,
    },

    TurnCompleted {
        id: ConversationId,
        stream_id: u64,
        content: String,
    },

    TurnFailed {
        id: ConversationId,
        stream_id: u64,
        failure: TurnFailure,
    },
}

/// A failed turn as shown to the user, in place of the pending reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnFailure {
    pub kind: FailureKind,
    pub notice: String,
    pub detail: String,
}

impl TurnFailure {
    pub fn from_error(error: &StreamError) -> Self {
        let kind = error.kind();
        Self {
            kind,
            notice: Self::notice_for(kind).to_string(),
            detail: error.to_string(),
        }
    }

    pub fn notice_for(kind: FailureKind) -> &'static str {
        match kind {
            FailureKind::NoResponse => {
                "Sorry, no response received from the server. Please try again later."
            }
            FailureKind::ConnectionFailed => {
                "Sorry, the connection to the server failed. Please try again later."
            }
            FailureKind::MalformedResponse => "The server returned an empty or malformed response.",
        }
    }
}

/// How the last driven turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed { content: String },
    Failed(TurnFailure),
}
