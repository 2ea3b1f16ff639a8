//! Routes inbound WhatsApp messages to the agent that owns the number

use std::sync::Arc;

use agentdesk_agent::{AgentError, ChatService};
use agentdesk_session::ChatMessage;
use tracing::{info, warn};

use crate::whatsapp::strip_prefix;
use crate::{Channel, OutboundMessage, Result};

/// Fields of an inbound Twilio webhook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundWhatsApp {
    pub from: String,
    pub to: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutcome {
    Replied {
        agent_id: String,
        session_id: String,
        reply: String,
    },
    /// Acknowledged without a reply
    Ignored(String),
}

pub struct WhatsAppBridge {
    chat: Arc<ChatService>,
    channel: Arc<dyn Channel>,
}

impl WhatsAppBridge {
    pub fn new(chat: Arc<ChatService>, channel: Arc<dyn Channel>) -> Self {
        Self { chat, channel }
    }

    /// Session id for one phone number talking to one agent
    pub fn session_id(agent_id: &str, phone: &str) -> String {
        format!("whatsapp:{}:{}", agent_id, phone)
    }

    pub async fn handle(&self, inbound: InboundWhatsApp) -> Result<BridgeOutcome> {
        let to = strip_prefix(&inbound.to);
        let from = strip_prefix(&inbound.from);
        info!("WhatsApp message from {} to {}", from, to);

        let Some(agent) = self.chat.config().agent_for_whatsapp(to) else {
            info!("No agent for WhatsApp number {}", to);
            return Ok(BridgeOutcome::Ignored(format!("no agent for {}", to)));
        };

        let session_id = Self::session_id(&agent.id, from);
        let sessions = self.chat.sessions();
        let session = sessions.get_or_create(&session_id, &agent.id).await?;

        // the new user turn counts toward the window
        let limit = self.chat.config().defaults.history_limit.saturating_sub(1);
        let history = session.history(Some(limit));

        let reply = match self.chat.reply(agent, history, &inbound.body).await {
            Ok(reply) => reply,
            Err(AgentError::MissingApiKey(provider)) => {
                warn!("Dropping WhatsApp message for {}: no {} key", agent.id, provider);
                return Ok(BridgeOutcome::Ignored(format!("no API key for {}", provider)));
            }
            Err(e) => return Err(e.into()),
        };

        sessions
            .append(&session_id, ChatMessage::user(inbound.body.trim()))
            .await?;
        sessions
            .append(&session_id, ChatMessage::assistant(&reply))
            .await?;

        self.channel
            .send(&OutboundMessage::new(from, &reply))
            .await?;

        Ok(BridgeOutcome::Replied {
            agent_id: agent.id.clone(),
            session_id,
            reply,
        })
    }
}
