//! Messaging channels (WhatsApp)

use async_trait::async_trait;
use thiserror::Error;

pub mod bridge;
pub mod webhook;
pub mod whatsapp;

pub use bridge::{BridgeOutcome, InboundWhatsApp, WhatsAppBridge};
pub use webhook::{router, serve};
pub use whatsapp::{strip_prefix, WhatsAppChannel};

/// Channel errors
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("{0} is not configured")]
    NotConfigured(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{channel} API error ({status}): {message}")]
    Api {
        channel: String,
        status: u16,
        message: String,
    },

    #[error(transparent)]
    Agent(#[from] agentdesk_agent::AgentError),

    #[error(transparent)]
    Session(#[from] agentdesk_session::SessionError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;

/// Message to deliver to one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}

/// Trait for chat channel implementations
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Send a message through this channel
    async fn send(&self, msg: &OutboundMessage) -> Result<()>;
}
