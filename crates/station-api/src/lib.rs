pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod models;

pub use client::{AgentCatalog, StationClient, DEFAULT_CHANNEL};
pub use console::Command;
pub use config::{ChatConfig, Config, EnvironmentProfile, LoggingConfig, StorageConfig};
pub use error::{ApiError, Result};
pub use logging::init_logging;
pub use models::{AgentOption, ApiResponse, RagOrder, SystemPrompt};
