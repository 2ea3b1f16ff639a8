//! Tool-augmented completion loop

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use agentdesk_provider::{ChatRequest, Completion, Message, Provider, ToolInvocation};
use agentdesk_session::{ChatMessage, SessionStore, ToolDetails, ToolLabel};

use crate::tools::{KnowledgeBase, RemoteToolExecutor, ToolCatalog, KNOWLEDGE_TOOL_NAME};
use crate::{AgentError, Result};

/// Answer given when the model keeps calling tools past the cap
pub const ITERATION_LIMIT_TEXT: &str =
    "Tool loop limit reached before the model produced a final answer.";

const DEFAULT_MAX_ITERATIONS: u32 = 8;

/// Sink for the turns a loop produces. Each call is one commit.
#[async_trait]
pub trait Transcript: Send + Sync {
    async fn record(&self, message: ChatMessage) -> Result<()>;
}

/// Records into a stored session
pub struct SessionTranscript<'a> {
    store: &'a SessionStore,
    session_id: &'a str,
}

impl<'a> SessionTranscript<'a> {
    pub fn new(store: &'a SessionStore, session_id: &'a str) -> Self {
        Self { store, session_id }
    }
}

#[async_trait]
impl Transcript for SessionTranscript<'_> {
    async fn record(&self, message: ChatMessage) -> Result<()> {
        self.store.append(self.session_id, message).await?;
        Ok(())
    }
}

/// Keeps turns in memory
#[derive(Default)]
pub struct MemoryTranscript {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl Transcript for MemoryTranscript {
    async fn record(&self, message: ChatMessage) -> Result<()> {
        self.messages.lock().push(message);
        Ok(())
    }
}

/// Inputs for one user turn
#[derive(Debug, Clone, Default)]
pub struct LoopRequest {
    pub model: String,
    pub system: String,
    /// Prior turns ending with the new user message
    pub history: Vec<Message>,
    pub catalog: ToolCatalog,
    pub knowledge: KnowledgeBase,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    pub text: String,
    /// Provider calls made
    pub iterations: u32,
    pub tool_calls: u32,
    pub hit_limit: bool,
}

enum LoopState {
    AwaitingModel,
    ResolvingTool(ToolInvocation),
    Done(String),
}

/// Drives provider calls until the model answers without a tool call
pub struct CompletionLoop<'a> {
    provider: &'a dyn Provider,
    remote: &'a dyn RemoteToolExecutor,
    transcript: &'a dyn Transcript,
    max_iterations: u32,
}

impl<'a> CompletionLoop<'a> {
    pub fn new(
        provider: &'a dyn Provider,
        remote: &'a dyn RemoteToolExecutor,
        transcript: &'a dyn Transcript,
    ) -> Self {
        Self {
            provider,
            remote,
            transcript,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Run one user turn to completion. Provider failures abort; tool
    /// failures are fed back to the model.
    pub async fn run(&self, request: LoopRequest) -> Result<LoopOutcome> {
        let LoopRequest {
            model,
            system,
            history,
            catalog,
            knowledge,
            max_tokens,
        } = request;

        let mut chat = ChatRequest {
            model,
            system,
            messages: history,
            tools: catalog.specs(),
            max_tokens,
        };

        let mut state = LoopState::AwaitingModel;
        let mut iterations = 0;
        let mut tool_calls = 0;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    if iterations >= self.max_iterations {
                        warn!(
                            "Stopping after {} provider calls without a final answer",
                            iterations
                        );
                        return Ok(LoopOutcome {
                            text: ITERATION_LIMIT_TEXT.to_string(),
                            iterations,
                            tool_calls,
                            hit_limit: true,
                        });
                    }

                    iterations += 1;
                    debug!("Completion round {} with {}", iterations, chat.model);

                    match self.provider.complete(&chat).await? {
                        Completion::Final { text } => LoopState::Done(text),
                        Completion::ToolCall(invocation) => LoopState::ResolvingTool(invocation),
                    }
                }
                LoopState::ResolvingTool(invocation) => {
                    tool_calls += 1;
                    let output = self.resolve(&invocation, &catalog, &knowledge).await?;

                    let result = Message::tool_result(
                        &invocation.correlation_token,
                        &invocation.name,
                        output,
                    );
                    chat.messages.push(Message::ToolCall(invocation));
                    chat.messages.push(result);

                    LoopState::AwaitingModel
                }
                LoopState::Done(text) => {
                    return Ok(LoopOutcome {
                        text,
                        iterations,
                        tool_calls,
                        hit_limit: false,
                    });
                }
            };
        }
    }

    /// Output text for a tool call. Only transcript failures are errors.
    async fn resolve(
        &self,
        invocation: &ToolInvocation,
        catalog: &ToolCatalog,
        knowledge: &KnowledgeBase,
    ) -> Result<String> {
        let name = invocation.name.as_str();
        info!("Resolving tool call {}", name);

        if name == KNOWLEDGE_TOOL_NAME {
            self.transcript
                .record(ChatMessage::tool(
                    ToolLabel::KnowledgeSearch,
                    "Searching knowledge base...",
                    None,
                ))
                .await?;
            let query = invocation
                .arguments
                .get("query")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let output = knowledge.search(query);
            self.transcript
                .record(ChatMessage::tool(
                    ToolLabel::KnowledgeFound,
                    knowledge.found_message(),
                    None,
                ))
                .await?;
            return Ok(output);
        }

        let server_url = catalog
            .get(name)
            .and_then(|entry| entry.origin.server_url())
            .map(str::to_string);

        let result = match &server_url {
            Some(url) => {
                self.remote
                    .call(url, name, invocation.arguments.clone())
                    .await
            }
            None => Err(AgentError::ToolExecution(format!("Tool {} not found", name))),
        };

        match result {
            Ok(output) => {
                self.transcript
                    .record(ChatMessage::tool(
                        ToolLabel::McpResult,
                        format!("{} completed", name),
                        Some(ToolDetails {
                            tool_name: name.to_string(),
                            input: invocation.arguments.clone(),
                            output: Some(output.clone()),
                            error: None,
                            server_url,
                        }),
                    ))
                    .await?;
                Ok(output)
            }
            Err(e) => {
                let error = e.to_string();
                warn!("Tool {} failed: {}", name, error);
                self.transcript
                    .record(ChatMessage::tool(
                        ToolLabel::McpError,
                        format!("{} failed: {}", name, error),
                        Some(ToolDetails {
                            tool_name: name.to_string(),
                            input: invocation.arguments.clone(),
                            output: None,
                            error: Some(error.clone()),
                            server_url,
                        }),
                    ))
                    .await?;
                Ok(format!("Error calling tool: {}", error))
            }
        }
    }
}
