use config::{Config as ConfigLoader, Environment, File, FileFormat};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use station_session::SessionConfig;
use station_stream::SseTransportConfig;

use crate::error::{ApiError, Result};

/// Built-in settings, overridden by files and environment variables.
const DEFAULTS: &str = r#"
environment = "development"

[environments.development]
base_url = "http://192.168.1.104:8091"
api_prefix = "/ai-agent-station/api/v1"
timeout_ms = 30000

[environments.test]
base_url = "http://test-backend:8092"
api_prefix = "/ai-agent-station/api/v1"
timeout_ms = 30000

[environments.production]
base_url = "https://api.yourdomain.com"
api_prefix = "/api/v1"
timeout_ms = 30000

[chat]
connect_timeout_ms = 10000
rename_max_chars = 10
title_max_chars = 20
channel = "chat_stream"

[storage]
dir = ".station/history"

[logging]
level = "info"
format = "pretty"
"#;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the active backend profile.
    pub environment: String,
    pub environments: HashMap<String, EnvironmentProfile>,
    pub chat: ChatConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Where one backend deployment lives.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct EnvironmentProfile {
    pub base_url: String,
    pub api_prefix: String,
    /// Timeout for the non-streaming metadata calls.
    pub timeout_ms: u64,
}

impl EnvironmentProfile {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Time allowed for the first frame of a reply.
    pub connect_timeout_ms: u64,
    pub rename_max_chars: usize,
    pub title_max_chars: usize,
    /// Channel used when listing agents.
    pub channel: String,
    /// Fixed agent; otherwise the first one the backend lists is used.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub rag_id: Option<String>,
}

impl ChatConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from built-in defaults, TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. built-in defaults
    /// 2. config/default.toml
    /// 3. config/{STATION_ENV}.toml (if STATION_ENV is set)
    /// 4. Environment variables such as `STATION__CHAT__CONNECT_TIMEOUT_MS`
    pub fn load() -> Result<Self> {
        let env = std::env::var("STATION_ENV").ok();
        Self::load_from(Path::new("config"), env.as_deref())
    }

    /// Same layering as [`load`](Self::load) with an explicit config directory.
    pub fn load_from(dir: &Path, env: Option<&str>) -> Result<Self> {
        let mut builder = ConfigLoader::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false));

        if let Some(env) = env {
            builder = builder.add_source(File::with_name(&dir.join(env).to_string_lossy()).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("STATION")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.profile()?;
        Ok(cfg)
    }

    /// Load a single file on top of the built-in defaults (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::builder()
            .add_source(File::from_str(DEFAULTS, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.profile()?;
        Ok(cfg)
    }

    /// The active backend profile.
    pub fn profile(&self) -> Result<&EnvironmentProfile> {
        self.environments
            .get(&self.environment)
            .ok_or_else(|| ApiError::Config(format!("Unknown environment profile '{}'", self.environment)))
    }

    /// Apply the environment persisted by the user, if it names a known profile.
    pub fn with_environment_override(mut self, selected: Option<String>) -> Self {
        match selected {
            Some(name) if self.environments.contains_key(&name) => {
                tracing::info!(environment = %name, "Using persisted environment selection");
                self.environment = name;
            }
            Some(name) => {
                tracing::warn!(environment = %name, "Ignoring unknown persisted environment");
            }
            None => {}
        }
        self
    }

    pub fn transport_config(&self) -> Result<SseTransportConfig> {
        let profile = self.profile()?;
        Ok(SseTransportConfig::new(&profile.base_url, &profile.api_prefix)
            .with_connect_timeout(self.chat.connect_timeout()))
    }

    pub fn session_config(&self, agent_id: impl Into<String>) -> SessionConfig {
        let config = SessionConfig::new(agent_id)
            .with_connect_timeout(self.chat.connect_timeout())
            .with_rename_max_chars(self.chat.rename_max_chars)
            .with_title_max_chars(self.chat.title_max_chars);

        match self.chat.rag_id.as_deref() {
            Some(rag_id) if !rag_id.is_empty() => config.with_rag(rag_id),
            _ => config,
        }
    }
}
