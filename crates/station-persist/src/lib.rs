pub mod backend;
pub mod error;
pub mod file_backend;
pub mod models;
pub mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{PersistError, Result};
pub use file_backend::FileBackend;
pub use models::{Conversation, ConversationId, Message, StoredConversation};
pub use store::{ConversationEntry, HistoryStore, CHAT_KEY_PREFIX, CURRENT_CHAT_KEY, ENVIRONMENT_KEY};
