use std::sync::Arc;

use crate::backend::{MemoryBackend, StorageBackend};
use crate::models::{Conversation, ConversationId, StoredConversation};

pub const CHAT_KEY_PREFIX: &str = "chat_";
pub const CURRENT_CHAT_KEY: &str = "currentChatId";
pub const ENVIRONMENT_KEY: &str = "app_environment";

/// A conversation together with the id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationEntry {
    pub id: ConversationId,
    pub conversation: Conversation,
}

fn chat_key(id: &ConversationId) -> String {
    format!("{}{}", CHAT_KEY_PREFIX, id)
}

/// Conversation history on top of a [`StorageBackend`].
///
/// Storage and serialization failures never reach the caller: they are
/// logged and the operation degrades to a no-op (`false` / `None`).
#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn StorageBackend>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load a conversation, migrating the legacy array encoding in place.
    pub fn get(&self, id: &ConversationId) -> Option<Conversation> {
        let raw = self.read(&chat_key(id))?;

        match serde_json::from_str::<StoredConversation>(&raw) {
            Ok(StoredConversation::Record(conversation)) => Some(conversation),
            Ok(StoredConversation::Legacy(messages)) => {
                let conversation = Conversation {
                    name: Conversation::legacy_name(id),
                    messages,
                };
                tracing::info!(conversation_id = %id, "Migrating legacy conversation entry");
                self.put(id, &conversation);
                Some(conversation)
            }
            Err(e) => {
                tracing::warn!(conversation_id = %id, error = %e, "Unreadable conversation entry");
                None
            }
        }
    }

    pub fn put(&self, id: &ConversationId, conversation: &Conversation) -> bool {
        let raw = match serde_json::to_string(conversation) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(conversation_id = %id, error = %e, "Failed to serialize conversation");
                return false;
            }
        };
        self.write(&chat_key(id), &raw)
    }

    pub fn remove(&self, id: &ConversationId) -> bool {
        match self.backend.remove_item(&chat_key(id)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(conversation_id = %id, error = %e, "Failed to remove conversation");
                false
            }
        }
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.read(&chat_key(id)).is_some()
    }

    /// Ids of every stored conversation, in backend key order.
    pub fn ids(&self) -> Vec<ConversationId> {
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to enumerate storage keys");
                return Vec::new();
            }
        };

        keys.into_iter()
            .filter_map(|key| key.strip_prefix(CHAT_KEY_PREFIX).map(ConversationId::from))
            .collect()
    }

    /// All conversations, current one first, the rest in backend key order.
    pub fn list(&self) -> Vec<ConversationEntry> {
        let mut ids = self.ids();

        if let Some(current) = self.current_id() {
            if let Some(pos) = ids.iter().position(|id| *id == current) {
                let current = ids.remove(pos);
                ids.insert(0, current);
            }
        }

        ids.into_iter()
            .filter_map(|id| {
                let conversation = self.get(&id)?;
                Some(ConversationEntry { id, conversation })
            })
            .collect()
    }

    pub fn current_id(&self) -> Option<ConversationId> {
        self.read(CURRENT_CHAT_KEY)
            .filter(|id| !id.is_empty())
            .map(ConversationId::from)
    }

    pub fn set_current_id(&self, id: &ConversationId) -> bool {
        self.write(CURRENT_CHAT_KEY, id.as_str())
    }

    pub fn clear_current_id(&self) -> bool {
        match self.backend.remove_item(CURRENT_CHAT_KEY) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear current conversation id");
                false
            }
        }
    }

    /// Remove every conversation and the current id. Returns how many
    /// conversations were removed.
    pub fn clear_all(&self) -> usize {
        let removed = self.ids().iter().filter(|id| self.remove(id)).count();
        self.clear_current_id();
        tracing::info!(removed, "Cleared conversation history");
        removed
    }

    pub fn environment_override(&self) -> Option<String> {
        self.read(ENVIRONMENT_KEY).filter(|env| !env.is_empty())
    }

    pub fn set_environment_override(&self, environment: &str) -> bool {
        self.write(ENVIRONMENT_KEY, environment)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get_item(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage read failed");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> bool {
        match self.backend.set_item(key, value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Storage write failed");
                false
            }
        }
    }
}
