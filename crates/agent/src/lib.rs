//! Agent runtime
//!
//! Builds the tool catalog for an agent, drives the tool-augmented
//! completion loop and records every turn of a conversation.

use thiserror::Error;

pub mod chat;
pub mod context;
pub mod loop_agent;
pub mod tools;

pub use chat::{ChatReply, ChatService, ConfiguredProviders, ProviderSource};
pub use context::ContextBuilder;
pub use loop_agent::{
    CompletionLoop, LoopOutcome, LoopRequest, MemoryTranscript, SessionTranscript, Transcript,
    ITERATION_LIMIT_TEXT,
};
pub use tools::{
    CatalogEntry, KnowledgeBase, RemoteToolExecutor, ToolCatalog, ToolOrigin, KNOWLEDGE_TOOL_NAME,
};

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    /// Vendor call failed; ends the turn
    #[error("{0}")]
    Provider(#[from] agentdesk_provider::ProviderError),

    /// Tool lookup or remote call failed; reported back to the model
    #[error("{0}")]
    ToolExecution(String),

    #[error("No API key configured for {0}. Add it to the providers section of the config.")]
    MissingApiKey(String),

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Session(#[from] agentdesk_session::SessionError),

    #[error(transparent)]
    Config(#[from] agentdesk_config::ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
