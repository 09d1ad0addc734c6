use std::sync::Arc;

use chrono::Local;
use station_persist::{Conversation, ConversationEntry, ConversationId, HistoryStore, Message};
use station_stream::{ChatStreamRequest, ChatTransport, StreamError, StreamHandle, TransportEvent};
use tokio::sync::broadcast;

use crate::config::{title_from, truncate_chars, SessionConfig};
use crate::events::{SessionEvent, TurnFailure, TurnOutcome};
use crate::state::StreamSession;

const EVENT_CAPACITY: usize = 256;

struct ActiveStream {
    session: StreamSession,
    handle: StreamHandle,
}

fn default_name() -> String {
    format!("New chat {}", Local::now().format("%H:%M:%S"))
}

/// Coordinates chat turns between user input, history and the transport.
///
/// Owns the current conversation id and at most one in-flight stream.
/// Submitting while a stream is in flight closes it first (last submit
/// wins). History is always read back from the store, so whatever the
/// render layer sees has already been persisted.
pub struct ChatSession {
    config: SessionConfig,
    transport: Arc<dyn ChatTransport>,
    store: HistoryStore,
    current_id: Option<ConversationId>,
    active: Option<ActiveStream>,
    last_outcome: Option<TurnOutcome>,
    events: broadcast::Sender<SessionEvent>,
}

impl ChatSession {
    pub fn new(config: SessionConfig, transport: Arc<dyn ChatTransport>, store: HistoryStore) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            transport,
            store,
            current_id: None,
            active: None,
            last_outcome: None,
            events,
        }
    }

    /// Restore the persisted current conversation, or start a new one.
    pub fn bootstrap(&mut self) -> ConversationId {
        let restored = self.store.current_id().filter(|id| self.store.contains(id));

        match restored {
            Some(id) => {
                tracing::info!(conversation_id = %id, "Restored current conversation");
                self.current_id = Some(id.clone());
                self.emit(SessionEvent::ConversationLoaded { id: id.clone() });
                id
            }
            None => self.create_conversation(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn current_id(&self) -> Option<&ConversationId> {
        self.current_id.as_ref()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        self.current_id.as_ref().and_then(|id| self.store.get(id))
    }

    pub fn active_stream(&self) -> Option<&StreamSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    pub fn set_agent(&mut self, agent_id: impl Into<String>) {
        self.config.agent_id = agent_id.into();
    }

    pub fn set_rag(&mut self, rag_id: Option<String>) {
        self.config.rag_id = rag_id;
    }

    pub fn list_conversations(&self) -> Vec<ConversationEntry> {
        self.store.list()
    }

    pub fn create_conversation(&mut self) -> ConversationId {
        self.cancel();

        let id = ConversationId::generate();
        self.store.put(&id, &Conversation::new(default_name()));
        self.store.set_current_id(&id);
        self.current_id = Some(id.clone());

        tracing::info!(conversation_id = %id, "Created conversation");
        self.emit(SessionEvent::ConversationCreated { id: id.clone() });
        id
    }

    /// Switch to another stored conversation. Returns `None` if it does not exist.
    pub fn load_conversation(&mut self, id: &ConversationId) -> Option<Conversation> {
        let conversation = self.store.get(id)?;

        if self.current_id.as_ref() != Some(id) {
            self.cancel();
        }
        self.store.set_current_id(id);
        self.current_id = Some(id.clone());

        self.emit(SessionEvent::ConversationLoaded { id: id.clone() });
        Some(conversation)
    }

    /// Append the user message and open a stream for it.
    ///
    /// Blank input is ignored. Returns the id of the opened stream.
    pub fn submit_message(&mut self, text: &str) -> Option<u64> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("Ignoring empty message");
            return None;
        }

        let id = match self.current_id.clone() {
            Some(id) => id,
            None => self.create_conversation(),
        };

        self.cancel();

        let mut conversation = self
            .store
            .get(&id)
            .unwrap_or_else(|| Conversation::new(default_name()));
        let message = Message::user(text);
        conversation.messages.push(message.clone());

        let renamed = conversation.messages.len() == 1;
        if renamed {
            conversation.name = title_from(text, self.config.title_max_chars);
        }

        self.store.put(&id, &conversation);
        self.emit(SessionEvent::MessageAppended {
            id: id.clone(),
            message,
        });
        if renamed {
            self.emit(SessionEvent::ConversationRenamed {
                id: id.clone(),
                name: conversation.name.clone(),
            });
        }

        let request = ChatStreamRequest::new(self.config.agent_id.clone(), text)
            .with_rag(self.config.rag_id.clone());
        let handle = self.transport.open(request);
        let stream_id = handle.id();

        tracing::info!(conversation_id = %id, stream_id, "Started chat turn");
        self.active = Some(ActiveStream {
            session: StreamSession::new(stream_id, id.clone()),
            handle,
        });
        self.emit(SessionEvent::StreamStarted { id, stream_id });

        Some(stream_id)
    }

    pub fn on_partial_text(&mut self, chunk: &str) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.session.push_delta(chunk) {
            return;
        }

        let event = SessionEvent::PartialText {
            id: active.session.target().clone(),
            stream_id: active.session.stream_id(),
            chunk: chunk.to_string(),
        };
        self.emit(event);
    }

    pub fn on_complete(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        active.handle.close();

        let Some(content) = active.session.complete() else {
            return;
        };
        let target = active.session.target().clone();
        let stream_id = active.session.stream_id();

        let mut conversation = self
            .store
            .get(&target)
            .unwrap_or_else(|| Conversation::new(default_name()));
        let message = Message::assistant(content.clone());
        conversation.messages.push(message.clone());
        self.store.put(&target, &conversation);

        tracing::info!(conversation_id = %target, stream_id, chars = content.len(), "Chat turn completed");
        self.last_outcome = Some(TurnOutcome::Completed {
            content: content.clone(),
        });
        self.emit(SessionEvent::MessageAppended {
            id: target.clone(),
            message,
        });
        self.emit(SessionEvent::TurnCompleted {
            id: target,
            stream_id,
            content,
        });
    }

    pub fn on_error(&mut self, error: StreamError) {
        self.fail_active(error);
    }

    pub fn on_timeout(&mut self) {
        let after = self.config.connect_timeout;
        self.fail_active(StreamError::Timeout { after });
    }

    /// Close the in-flight stream without reporting a failure.
    pub fn cancel(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };
        active.handle.close();
        tracing::info!(stream_id = active.session.stream_id(), "Cancelled in-flight chat turn");
        true
    }

    /// Rename a conversation, cut to the rename limit. Empty names and unknown ids are ignored.
    pub fn rename_conversation(&mut self, id: &ConversationId, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        let Some(mut conversation) = self.store.get(id) else {
            return false;
        };

        let name = truncate_chars(name, self.config.rename_max_chars);

        conversation.name = name.clone();
        if !self.store.put(id, &conversation) {
            return false;
        }

        self.emit(SessionEvent::ConversationRenamed { id: id.clone(), name });
        true
    }

    /// Delete a conversation. Deleting the current one starts a fresh conversation.
    pub fn delete_conversation(&mut self, id: &ConversationId) -> bool {
        let is_current = self.current_id.as_ref() == Some(id);
        if !is_current && !self.store.contains(id) {
            return false;
        }

        if is_current {
            self.cancel();
        }
        self.store.remove(id);
        self.emit(SessionEvent::ConversationDeleted { id: id.clone() });

        if is_current {
            self.current_id = None;
            self.store.clear_current_id();
            self.create_conversation();
        }
        true
    }

    /// Wipe all history and start a fresh conversation.
    pub fn clear_all(&mut self) -> ConversationId {
        self.cancel();
        let removed = self.store.clear_all();
        self.current_id = None;
        self.emit(SessionEvent::HistoryCleared { removed });
        self.create_conversation()
    }

    /// Next transport event of the active stream, `None` if idle or ended.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let active = self.active.as_mut()?;
        active.handle.next_event().await
    }

    pub fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::TextDelta(chunk) => self.on_partial_text(&chunk),
            TransportEvent::Done => self.on_complete(),
            TransportEvent::Failed(error) => self.on_error(error),
        }
    }

    /// Pump the active stream until the turn ends.
    ///
    /// Returns `None` when there was no turn in flight.
    pub async fn drive_turn(&mut self) -> Option<TurnOutcome> {
        self.last_outcome = None;

        while self.active.is_some() {
            match self.next_event().await {
                Some(event) => self.dispatch(event),
                None => self.on_error(StreamError::Connection(
                    "Stream ended without a terminal event".to_string(),
                )),
            }
        }

        self.last_outcome.take()
    }

    fn fail_active(&mut self, error: StreamError) {
        let Some(active) = self.active.as_mut() else {
            return;
        };

        let transitioned = if error.is_timeout() {
            active.session.time_out()
        } else {
            active.session.fail()
        };
        if !transitioned {
            tracing::debug!(error = %error, state = ?active.session.state(), "Ignoring stream error");
            return;
        }

        let Some(mut active) = self.active.take() else {
            return;
        };
        active.handle.close();

        let failure = TurnFailure::from_error(&error);
        let id = active.session.target().clone();
        let stream_id = active.session.stream_id();

        tracing::error!(conversation_id = %id, stream_id, error = %error, "Chat turn failed");
        self.last_outcome = Some(TurnOutcome::Failed(failure.clone()));
        self.emit(SessionEvent::TurnFailed {
            id,
            stream_id,
            failure,
        });
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine: rendering is optional
        let _ = self.events.send(event);
    }
}
