use station_persist::ConversationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Completed,
    Failed,
    TimedOut,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Completed | StreamState::Failed | StreamState::TimedOut)
    }
}

/// Lifecycle of the stream answering one submitted message.
///
/// Deltas are buffered here and only become a history message on completion.
#[derive(Debug, Clone)]
pub struct StreamSession {
    stream_id: u64,
    target: ConversationId,
    accumulated: String,
    state: StreamState,
}

impl StreamSession {
    pub fn new(stream_id: u64, target: ConversationId) -> Self {
        Self {
            stream_id,
            target,
            accumulated: String::new(),
            state: StreamState::Connecting,
        }
    }

    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    pub fn target(&self) -> &ConversationId {
        &self.target
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns `true` if the chunk was appended.
    pub fn push_delta(&mut self, chunk: &str) -> bool {
        if self.state.is_terminal() || chunk.is_empty() {
            return false;
        }
        self.accumulated.push_str(chunk);
        self.state = StreamState::Streaming;
        true
    }

    /// Finish the turn and hand out the accumulated text.
    pub fn complete(&mut self) -> Option<String> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = StreamState::Completed;
        Some(std::mem::take(&mut self.accumulated))
    }

    pub fn fail(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = StreamState::Failed;
        true
    }

    /// Only a stream still waiting for its first frame can time out.
    pub fn time_out(&mut self) -> bool {
        if self.state != StreamState::Connecting {
            return false;
        }
        self.state = StreamState::TimedOut;
        true
    }
}
