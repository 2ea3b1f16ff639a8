//! Configuration management for AgentDesk
//!
//! Loads and saves provider keys, agent profiles, tool servers and channel
//! settings from `~/.agentdesk/config.json`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, knowledge_dir, sessions_dir};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Credentials and endpoint override for one LLM vendor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// All LLM vendors
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub google: ProviderConfig,
}

impl ProvidersConfig {
    /// Vendor section by provider id
    pub fn get(&self, provider: &str) -> Option<&ProviderConfig> {
        match provider {
            "openai" => Some(&self.openai),
            "anthropic" => Some(&self.anthropic),
            "google" => Some(&self.google),
            _ => None,
        }
    }
}

/// Reference from an agent to one tool advertised by a tool server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    pub tool_id: String,
    pub tool_name: String,
}

/// A configured conversational agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Empty means the provider's default model
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub tools: Vec<ToolRef>,
    #[serde(default)]
    pub agent_speaks_first: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    /// IANA zone id (or `nyc`, `la`, `london`) for the date line; New York when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}

impl AgentProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: default_provider(),
            model: String::new(),
            system_prompt: String::new(),
            tools: Vec::new(),
            agent_speaks_first: false,
            first_message: None,
            whatsapp_number: None,
            time_zone: None,
        }
    }
}

/// Kind of tool integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolServerKind {
    /// Workflow-automation server reached over the tool RPC protocol
    #[default]
    N8n,
    /// Notification sender (SMS / email)
    Notification,
}

/// One tool advertised by a remote server, as last refreshed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteToolDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_input_schema")]
    pub input_schema: Value,
}

pub fn default_input_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// A configured tool integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ToolServerKind,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub available_tools: Vec<RemoteToolDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<String>,
}

/// Agent run defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: u32,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            agent: None,
            max_tokens: default_max_tokens(),
            max_tool_iterations: default_max_tool_iterations(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_max_tool_iterations() -> u32 {
    8
}

fn default_history_limit() -> usize {
    20
}

/// Tool RPC timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

/// WhatsApp bridge (Twilio)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub account_sid: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub from_number: String,
    #[serde(default = "default_twilio_base")]
    pub api_base: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base: default_twilio_base(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl WhatsAppConfig {
    pub fn has_credentials(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

fn default_twilio_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    18790
}

/// Messaging channels
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub agents: Vec<AgentProfile>,
    #[serde(default)]
    pub tools: Vec<ToolServer>,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from a specific location, falling back to defaults when missing
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to a specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Look up an agent by id
    pub fn agent(&self, id: &str) -> Result<&AgentProfile> {
        self.agents
            .iter()
            .find(|a| a.id == id)
            .ok_or_else(|| ConfigError::UnknownAgent(id.to_string()))
    }

    /// The configured default agent, or the first one
    pub fn default_agent(&self) -> Option<&AgentProfile> {
        match &self.defaults.agent {
            Some(id) => self.agents.iter().find(|a| &a.id == id),
            None => self.agents.first(),
        }
    }

    /// Agent bound to a WhatsApp number
    pub fn agent_for_whatsapp(&self, number: &str) -> Option<&AgentProfile> {
        self.agents
            .iter()
            .find(|a| a.whatsapp_number.as_deref() == Some(number))
    }

    /// API key for a provider id; `None` when unset
    pub fn api_key(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .map(|p| p.api_key.clone())
            .filter(|k| !k.is_empty())
    }

    /// Endpoint override for a provider id
    pub fn api_base(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_base.clone())
            .filter(|b| !b.is_empty())
    }

    /// Look up a tool server by id
    pub fn tool_server(&self, id: &str) -> Option<&ToolServer> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Insert or replace a tool server by id
    pub fn upsert_tool_server(&mut self, server: ToolServer) {
        match self.tools.iter_mut().find(|t| t.id == server.id) {
            Some(existing) => *existing = server,
            None => self.tools.push(server),
        }
    }
}

/// Create the config file and data directories
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Config created at {:?}", config_path);
    }

    for dir in [sessions_dir(), knowledge_dir()] {
        paths::ensure_dir(&dir).await?;
        debug!("Data directory ready at {:?}", dir);
    }

    Config::load().await
}
