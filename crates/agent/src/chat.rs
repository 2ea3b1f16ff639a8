//! Conversation entry points used by the CLI and channel bridges

use std::sync::Arc;

use tracing::{debug, info};

use agentdesk_config::{AgentProfile, Config};
use agentdesk_provider::{create_provider, Message, Provider, ProviderKind};
use agentdesk_session::{ChatMessage, ChatSession, KnowledgeStore, SessionStore, ToolLabel};

use crate::context::ContextBuilder;
use crate::loop_agent::{CompletionLoop, LoopRequest, MemoryTranscript, SessionTranscript, Transcript};
use crate::tools::{KnowledgeBase, RemoteToolExecutor, ToolCatalog};
use crate::{AgentError, Result};

/// Resolves the provider adapter for an agent
pub trait ProviderSource: Send + Sync {
    fn provider(&self, agent: &AgentProfile) -> Result<Arc<dyn Provider>>;
}

/// Providers built from configured API keys
pub struct ConfiguredProviders {
    config: Arc<Config>,
}

impl ConfiguredProviders {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

impl ProviderSource for ConfiguredProviders {
    fn provider(&self, agent: &AgentProfile) -> Result<Arc<dyn Provider>> {
        let kind: ProviderKind = agent.provider.parse()?;
        let api_key = self
            .config
            .api_key(kind.id())
            .ok_or_else(|| AgentError::MissingApiKey(kind.id().to_string()))?;

        Ok(Arc::from(create_provider(
            kind,
            api_key,
            self.config.api_base(kind.id()),
        )))
    }
}

/// Result of one user turn
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub model: String,
    pub tool_calls: u32,
    pub hit_limit: bool,
}

/// Runs user turns against configured agents
pub struct ChatService {
    config: Arc<Config>,
    sessions: SessionStore,
    knowledge: KnowledgeStore,
    remote: Arc<dyn RemoteToolExecutor>,
    providers: Arc<dyn ProviderSource>,
}

impl ChatService {
    pub fn new(
        config: Arc<Config>,
        sessions: SessionStore,
        knowledge: KnowledgeStore,
        remote: Arc<dyn RemoteToolExecutor>,
    ) -> Self {
        let providers = Arc::new(ConfiguredProviders::new(config.clone()));
        Self {
            config,
            sessions,
            knowledge,
            remote,
            providers,
        }
    }

    /// Replace the provider lookup
    pub fn with_providers(mut self, providers: Arc<dyn ProviderSource>) -> Self {
        self.providers = providers;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn knowledge(&self) -> &KnowledgeStore {
        &self.knowledge
    }

    /// Create a session, greeting the user when the agent speaks first
    pub async fn start_session(&self, agent: &AgentProfile) -> Result<ChatSession> {
        let session = self.sessions.create(&agent.id).await?;

        match agent.first_message.as_deref() {
            Some(greeting) if agent.agent_speaks_first && !greeting.trim().is_empty() => {
                Ok(self
                    .sessions
                    .append(&session.id, ChatMessage::assistant(greeting))
                    .await?)
            }
            _ => Ok(session),
        }
    }

    /// Run one user turn in a stored session, committing every turn
    pub async fn send(&self, agent: &AgentProfile, session_id: &str, text: &str) -> Result<ChatReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let session = self
            .sessions
            .append(session_id, ChatMessage::user(text))
            .await?;
        let provider = self.providers.provider(agent)?;

        let transcript = SessionTranscript::new(&self.sessions, session_id);
        let reply = self
            .run_turn(agent, provider.as_ref(), session.history(None), &transcript)
            .await?;

        transcript
            .record(ChatMessage::tool(
                ToolLabel::Thinking,
                format!("Generated response with {}", reply.model),
                None,
            ))
            .await?;
        transcript.record(ChatMessage::assistant(&reply.text)).await?;

        info!("Session {} answered by {}", session_id, reply.model);
        Ok(reply)
    }

    /// Run one user turn over caller-held history; nothing is stored
    pub async fn reply(&self, agent: &AgentProfile, history: Vec<Message>, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let provider = self.providers.provider(agent)?;
        let mut history = history;
        history.push(Message::user(text));

        let transcript = MemoryTranscript::new();
        let reply = self
            .run_turn(agent, provider.as_ref(), history, &transcript)
            .await?;
        debug!(
            "Reply from {} after {} tool turns",
            agent.id,
            transcript.messages().len()
        );
        Ok(reply.text)
    }

    async fn run_turn(
        &self,
        agent: &AgentProfile,
        provider: &dyn Provider,
        history: Vec<Message>,
        transcript: &dyn Transcript,
    ) -> Result<ChatReply> {
        let model = if agent.model.trim().is_empty() {
            provider.default_model()
        } else {
            agent.model.clone()
        };

        let documents = self.knowledge.list(&agent.id).await?;
        let catalog = ToolCatalog::build(agent, &self.config.tools, !documents.is_empty());
        let system = ContextBuilder::system_prompt(
            &agent.system_prompt,
            agent.time_zone.as_deref(),
            &catalog,
        );
        debug!(
            "Agent {} offers {} tools with {} documents",
            agent.id,
            catalog.len(),
            documents.len()
        );

        let request = LoopRequest {
            model: model.clone(),
            system,
            history,
            catalog,
            knowledge: KnowledgeBase::new(documents),
            max_tokens: self.config.defaults.max_tokens,
        };

        let outcome = CompletionLoop::new(provider, self.remote.as_ref(), transcript)
            .with_max_iterations(self.config.defaults.max_tool_iterations)
            .run(request)
            .await?;

        Ok(ChatReply {
            text: outcome.text,
            model,
            tool_calls: outcome.tool_calls,
            hit_limit: outcome.hit_limit,
        })
    }
}
