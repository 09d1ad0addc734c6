use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Status code the backend uses for a successful call.
pub const SUCCESS_CODE: &str = "0000";

/// Response envelope shared by all admin endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code.as_deref() == Some(SUCCESS_CODE) || self.success == Some(true)
    }

    /// Human-readable reason for a rejected call.
    pub fn error_info(&self) -> String {
        self.info
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

/// Agent selectable on the chat screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentOption {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub agent_name: String,
}

/// Knowledge base a turn can be grounded in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagOrder {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub rag_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPrompt {
    #[serde(default)]
    pub prompt_name: String,
    #[serde(default)]
    pub prompt_content: String,
}

impl SystemPrompt {
    /// Prefix a draft with this prompt, or use the prompt alone when the draft is blank.
    pub fn apply_to(&self, draft: &str) -> String {
        if draft.trim().is_empty() {
            self.prompt_content.clone()
        } else {
            format!("{}\n\n{}", self.prompt_content, draft)
        }
    }
}

/// Ids arrive as JSON numbers from some endpoints and as strings from others.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_success_by_code_or_flag() {
        let by_code: ApiResponse<Vec<RagOrder>> = serde_json::from_value(json!({
            "code": "0000",
            "info": "ok",
            "data": [{"id": 1, "ragName": "docs"}]
        }))
        .unwrap();
        assert!(by_code.is_success());
        assert_eq!(by_code.data.unwrap()[0].id, "1");

        let by_flag: ApiResponse<Vec<RagOrder>> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(by_flag.is_success());
        assert!(by_flag.data.is_none());
    }

    #[test]
    fn test_envelope_error_info() {
        let rejected: ApiResponse<Value> =
            serde_json::from_value(json!({"code": "0001", "message": "denied"})).unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.error_info(), "denied");

        let bare: ApiResponse<Value> = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare.error_info(), "Request failed");
    }

    #[test]
    fn test_agent_ids_accept_strings() {
        let agent: AgentOption = serde_json::from_value(json!({"id": "a-1", "agentName": "Helper"})).unwrap();
        assert_eq!(agent.id, "a-1");
        assert_eq!(agent.agent_name, "Helper");
    }

    #[test]
    fn test_prompt_apply() {
        let prompt = SystemPrompt {
            prompt_name: "Translator".to_string(),
            prompt_content: "Translate to French.".to_string(),
        };
        assert_eq!(prompt.apply_to("Good morning"), "Translate to French.\n\nGood morning");
        assert_eq!(prompt.apply_to("  "), "Translate to French.");
    }
}
