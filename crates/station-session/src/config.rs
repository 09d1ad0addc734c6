use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Agent answering the turns.
    pub agent_id: String,
    /// Knowledge base to ground answers in, if any.
    pub rag_id: Option<String>,
    /// How long to wait for the first frame of a turn.
    pub connect_timeout: Duration,
    /// Limit applied when the user renames a conversation.
    pub rename_max_chars: usize,
    /// Limit applied when the first message becomes the conversation name.
    pub title_max_chars: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            agent_id: String::new(),
            rag_id: None,
            connect_timeout: Duration::from_secs(10),
            rename_max_chars: 10,
            title_max_chars: 20,
        }
    }
}

impl SessionConfig {
    pub fn new(agent_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            ..Self::default()
        }
    }

    pub fn with_rag(mut self, rag_id: impl Into<String>) -> Self {
        self.rag_id = Some(rag_id.into());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_rename_max_chars(mut self, max: usize) -> Self {
        self.rename_max_chars = max;
        self
    }

    pub fn with_title_max_chars(mut self, max: usize) -> Self {
        self.title_max_chars = max;
        self
    }
}

/// Cut `text` to at most `max` characters.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Conversation title from a first message: truncated with an ellipsis.
pub(crate) fn title_from(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", truncate_chars(text, max))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::new("agent-1");
        assert_eq!(config.agent_id, "agent-1");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.rename_max_chars, 10);
        assert_eq!(config.title_max_chars, 20);
        assert!(config.rag_id.is_none());
    }

    #[test]
    fn test_builder() {
        let config = SessionConfig::new("a")
            .with_rag("7")
            .with_connect_timeout(Duration::from_millis(250))
            .with_rename_max_chars(4)
            .with_title_max_chars(8);
        assert_eq!(config.rag_id.as_deref(), Some("7"));
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.rename_max_chars, 4);
        assert_eq!(config.title_max_chars, 8);
    }

    #[test]
    fn test_truncation_counts_chars() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("短い名前です", 3), "短い名");
        assert_eq!(truncate_chars("Foo", 10), "Foo");
    }

    #[test]
    fn test_title_from() {
        assert_eq!(title_from("hello", 20), "hello");
        assert_eq!(title_from("abcdefghij", 4), "abcd...");
        assert_eq!(title_from("abcd", 4), "abcd");
    }
}
