use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

static LAST_ISSUED_MS: AtomicI64 = AtomicI64::new(0);

/// Millisecond-timestamp identifier of a conversation.
///
/// Ids generated in one process are strictly increasing, so two conversations
/// created within the same millisecond still get distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn generate() -> Self {
        let now = Utc::now().timestamp_millis();
        let mut last = LAST_ISSUED_MS.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match LAST_ISSUED_MS.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Self(next.to_string()),
                Err(actual) => last = actual,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Creation time, when the id is a timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.0.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub is_assistant: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_assistant: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_assistant: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
        }
    }

    /// Name given to a conversation recovered from the legacy array encoding.
    pub fn legacy_name(id: &ConversationId) -> String {
        match id.created_at() {
            Some(created) => format!("Chat {}", created.with_timezone(&Local).format("%Y-%m-%d")),
            None => "Chat".to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Every shape a conversation entry has been persisted in.
///
/// Older clients stored the bare message array; it is detected by shape and
/// wrapped into the record form on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredConversation {
    Legacy(Vec<Message>),
    Record(Conversation),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let ids: Vec<i64> = (0..50)
            .map(|_| ConversationId::generate().as_str().parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_id_created_at() {
        let id = ConversationId::from("1700000000000");
        assert_eq!(id.created_at().unwrap().timestamp(), 1_700_000_000);
        assert!(ConversationId::from("not-a-number").created_at().is_none());
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&Message::assistant("Hi")).unwrap();
        assert_eq!(json, r#"{"content":"Hi","isAssistant":true}"#);
    }

    #[test]
    fn test_shape_detection() {
        let legacy: StoredConversation =
            serde_json::from_str(r#"[{"content":"hello","isAssistant":false}]"#).unwrap();
        assert!(matches!(legacy, StoredConversation::Legacy(ref m) if m.len() == 1));

        let empty_legacy: StoredConversation = serde_json::from_str("[]").unwrap();
        assert!(matches!(empty_legacy, StoredConversation::Legacy(ref m) if m.is_empty()));

        let record: StoredConversation =
            serde_json::from_str(r#"{"name":"Foo","messages":[]}"#).unwrap();
        assert!(matches!(record, StoredConversation::Record(ref c) if c.name == "Foo"));
    }

    #[test]
    fn test_legacy_name() {
        assert!(Conversation::legacy_name(&ConversationId::from("1700000000000")).starts_with("Chat 2023-11-1"));
        assert_eq!(Conversation::legacy_name(&ConversationId::from("abc")), "Chat");
    }
}
