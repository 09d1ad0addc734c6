use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::EnvironmentProfile;
use crate::error::{ApiError, Result};
use crate::models::{AgentOption, ApiResponse, RagOrder, SystemPrompt};

const AGENTS_PATH: &str = "/ai/admin/agent/queryAllAgentConfigListByChannel";
const RAG_ORDERS_PATH: &str = "/ai/admin/rag/queryAllValidRagOrder";
const SYSTEM_PROMPTS_PATH: &str = "/ai/admin/client/system/prompt/queryAllSystemPromptConfig";

/// Channel whose agents can answer streamed chat turns.
pub const DEFAULT_CHANNEL: &str = "chat_stream";

/// Read-only catalog of what the chat screen can pick from.
#[async_trait]
pub trait AgentCatalog: Send + Sync {
    async fn list_agents(&self, channel: &str) -> Result<Vec<AgentOption>>;

    async fn list_rag_orders(&self) -> Result<Vec<RagOrder>>;

    async fn list_system_prompts(&self) -> Result<Vec<SystemPrompt>>;
}

/// Agent station admin API client (HTTP direct)
pub struct StationClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl StationClient {
    pub fn new(base_url: &str, api_prefix: &str, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url: format!("{}{}", base_url.trim_end_matches('/'), api_prefix),
        })
    }

    pub fn from_profile(profile: &EnvironmentProfile) -> Result<Self> {
        Self::new(&profile.base_url, &profile.api_prefix, profile.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a form and unwrap the response envelope. A successful call without data yields `None`.
    async fn post_form<T>(&self, path: &str, form: &[(&str, &str)]) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying backend");

        let response = self.http_client.post(&url).form(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let envelope: ApiResponse<T> = response.json().await?;
        if !envelope.is_success() {
            let info = envelope.error_info();
            let code = envelope.code.unwrap_or_default();
            tracing::warn!(path, code = %code, info = %info, "Backend rejected request");
            return Err(ApiError::Rejected { code, info });
        }

        Ok(envelope.data)
    }
}

#[async_trait]
impl AgentCatalog for StationClient {
    async fn list_agents(&self, channel: &str) -> Result<Vec<AgentOption>> {
        let agents = self.post_form(AGENTS_PATH, &[("channel", channel)]).await?;
        Ok(agents.unwrap_or_default())
    }

    async fn list_rag_orders(&self) -> Result<Vec<RagOrder>> {
        let orders = self.post_form(RAG_ORDERS_PATH, &[]).await?;
        Ok(orders.unwrap_or_default())
    }

    async fn list_system_prompts(&self) -> Result<Vec<SystemPrompt>> {
        let prompts = self.post_form(SYSTEM_PROMPTS_PATH, &[]).await?;
        Ok(prompts.unwrap_or_default())
    }
}
