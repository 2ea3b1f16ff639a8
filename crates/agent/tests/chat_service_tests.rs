//! Chat service tests
//!
//! Run whole user turns against temp-dir stores with a mocked provider.

mod common;

use std::sync::Arc;

use agentdesk_agent::{AgentError, ChatService, ProviderSource};
use agentdesk_config::{AgentProfile, Config, ProviderConfig};
use agentdesk_provider::{Completion, Message, Provider};
use agentdesk_session::{KnowledgeStore, MessageRole, SessionStore, ToolLabel};
use common::{tool_call, MockProvider, MockRemote};
use mockall::Sequence;
use serde_json::json;
use tempfile::TempDir;

struct FixedProvider(Arc<dyn Provider>);

impl ProviderSource for FixedProvider {
    fn provider(&self, _agent: &AgentProfile) -> agentdesk_agent::Result<Arc<dyn Provider>> {
        Ok(self.0.clone())
    }
}

fn support_agent() -> AgentProfile {
    let mut agent = AgentProfile::new("support", "Support");
    agent.model = "gpt-4.1".to_string();
    agent.system_prompt = "You help customers.".to_string();
    agent
}

fn service(dir: &TempDir, config: Config) -> ChatService {
    ChatService::new(
        Arc::new(config),
        SessionStore::new(dir.path().join("sessions")),
        KnowledgeStore::new(dir.path().join("knowledge")),
        Arc::new(MockRemote::new()),
    )
}

fn with_provider(service: ChatService, provider: MockProvider) -> ChatService {
    service.with_providers(Arc::new(FixedProvider(Arc::new(provider))))
}

// ===== Session Start Tests =====

/// An agent that speaks first greets in a new session
#[tokio::test]
async fn test_start_session_records_first_message() {
    let dir = tempfile::tempdir().unwrap();
    let chat = service(&dir, Config::default());

    let mut agent = support_agent();
    agent.agent_speaks_first = true;
    agent.first_message = Some("Hi, how can I help?".to_string());

    let session = chat.start_session(&agent).await.unwrap();
    assert_eq!(session.messages.len(), 1);
    assert_eq!(session.messages[0].role, MessageRole::Assistant);
    assert_eq!(session.messages[0].content, "Hi, how can I help?");
}

/// No greeting without the flag or with a blank message
#[tokio::test]
async fn test_start_session_without_greeting() {
    let dir = tempfile::tempdir().unwrap();
    let chat = service(&dir, Config::default());

    let mut agent = support_agent();
    agent.first_message = Some("Hello".to_string());
    assert!(chat.start_session(&agent).await.unwrap().messages.is_empty());

    agent.agent_speaks_first = true;
    agent.first_message = Some("   ".to_string());
    assert!(chat.start_session(&agent).await.unwrap().messages.is_empty());
}

// ===== Send Tests =====

/// A turn records user, thinking and assistant messages in order
#[tokio::test]
async fn test_send_records_turns() {
    let dir = tempfile::tempdir().unwrap();
    let mut provider = MockProvider::new();
    provider
        .expect_complete()
        .times(1)
        .withf(|req| {
            req.model == "gpt-4.1"
                && req.system.starts_with("Current date and time: ")
                && req.system.ends_with("\n\nYou help customers.")
                && req.tools.is_empty()
                && req.messages.last() == Some(&Message::user("Where is my order?"))
        })
        .returning(|_| Ok(Completion::text("It ships today.")));
    let chat = with_provider(service(&dir, Config::default()), provider);
    let agent = support_agent();

    let session = chat.start_session(&agent).await.unwrap();
    let reply = chat
        .send(&agent, &session.id, "  Where is my order?  ")
        .await
        .unwrap();
    assert_eq!(reply.text, "It ships today.");
    assert_eq!(reply.model, "gpt-4.1");
    assert!(!reply.hit_limit);

    let stored = chat.sessions().load(&session.id).await.unwrap();
    let contents: Vec<_> = stored.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["Where is my order?", "Generated response with gpt-4.1", "It ships today."]
    );
    assert_eq!(stored.messages[1].tool_label, Some(ToolLabel::Thinking));
}

/// Earlier turns are sent as history but tool turns are not
#[tokio::test]
async fn test_send_includes_prior_turns() {
    let dir = tempfile::tempdir().unwrap();
    let mut seq = Sequence::new();
    let mut provider = MockProvider::new();
    provider
        .expect_complete()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(Completion::text("first answer")));
    provider
        .expect_complete()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|req| {
            req.messages
                == vec![
                    Message::user("one"),
                    Message::assistant("first answer"),
                    Message::user("two"),
                ]
        })
        .returning(|_| Ok(Completion::text("second answer")));
    let chat = with_provider(service(&dir, Config::default()), provider);
    let agent = support_agent();

    let session = chat.start_session(&agent).await.unwrap();
    chat.send(&agent, &session.id, "one").await.unwrap();
    let reply = chat.send(&agent, &session.id, "two").await.unwrap();
    assert_eq!(reply.text, "second answer");
}

/// Uploaded documents add the knowledge tool and prompt hint
#[tokio::test]
async fn test_send_with_knowledge() {
    let dir = tempfile::tempdir().unwrap();
    let mut seq = Sequence::new();
    let mut provider = MockProvider::new();
    provider
        .expect_complete()
        .times(1)
        .in_sequence(&mut seq)
        .withf(|req| {
            req.tools.len() == 1
                && req.tools[0].name == "search_knowledge_base"
                && req.system.contains("You have access to a knowledge base.")
        })
        .returning(|_| Ok(tool_call("call_1", "search_knowledge_base", json!({"query": "hours"}))));
    provider
        .expect_complete()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(Completion::text("We open at 9.")));
    let chat = with_provider(service(&dir, Config::default()), provider);
    let agent = support_agent();
    chat.knowledge()
        .add("support", "hours.txt", "Open 9 to 5")
        .await
        .unwrap();

    let session = chat.start_session(&agent).await.unwrap();
    let reply = chat.send(&agent, &session.id, "When do you open?").await.unwrap();
    assert_eq!(reply.text, "We open at 9.");
    assert_eq!(reply.tool_calls, 1);

    let labels: Vec<_> = chat
        .sessions()
        .load(&session.id)
        .await
        .unwrap()
        .messages
        .iter()
        .map(|m| m.tool_label)
        .collect();
    assert_eq!(
        labels,
        vec![
            None,
            Some(ToolLabel::KnowledgeSearch),
            Some(ToolLabel::KnowledgeFound),
            Some(ToolLabel::Thinking),
            None,
        ]
    );
}

/// Empty input never reaches the provider
#[tokio::test]
async fn test_send_rejects_empty_message() {
    let dir = tempfile::tempdir().unwrap();
    let chat = with_provider(service(&dir, Config::default()), MockProvider::new());
    let agent = support_agent();
    let session = chat.start_session(&agent).await.unwrap();

    let err = chat.send(&agent, &session.id, "   ").await.unwrap_err();
    assert!(matches!(err, AgentError::EmptyMessage));
    assert!(chat.sessions().load(&session.id).await.unwrap().messages.is_empty());
}

/// A missing key fails after the user turn is stored
#[tokio::test]
async fn test_send_without_api_key() {
    let dir = tempfile::tempdir().unwrap();
    let chat = service(&dir, Config::default());
    let agent = support_agent();
    let session = chat.start_session(&agent).await.unwrap();

    let err = chat.send(&agent, &session.id, "hello").await.unwrap_err();
    assert!(matches!(err, AgentError::MissingApiKey(_)));
    assert_eq!(
        err.to_string(),
        "No API key configured for openai. Add it to the providers section of the config."
    );

    let stored = chat.sessions().load(&session.id).await.unwrap();
    assert_eq!(stored.messages.len(), 1);
    assert_eq!(stored.messages[0].role, MessageRole::User);
}

/// Configured keys are picked per agent provider
#[tokio::test]
async fn test_configured_providers_resolve_kind() {
    use agentdesk_agent::ConfiguredProviders;
    use agentdesk_provider::ProviderKind;

    let mut config = Config::default();
    config.providers.anthropic = ProviderConfig {
        api_key: "sk-ant".to_string(),
        api_base: None,
    };
    let providers = ConfiguredProviders::new(Arc::new(config));

    let mut agent = support_agent();
    agent.provider = "anthropic".to_string();
    let provider = providers.provider(&agent).unwrap();
    assert_eq!(provider.kind(), ProviderKind::Anthropic);

    agent.provider = "google".to_string();
    assert!(matches!(
        providers.provider(&agent),
        Err(AgentError::MissingApiKey(p)) if p == "google"
    ));

    agent.provider = "mistral".to_string();
    assert!(matches!(providers.provider(&agent), Err(AgentError::Provider(_))));
}

// ===== Reply Tests =====

/// Replies over caller history store nothing
#[tokio::test]
async fn test_reply_is_stateless() {
    let dir = tempfile::tempdir().unwrap();
    let mut provider = MockProvider::new();
    provider
        .expect_complete()
        .times(1)
        .withf(|req| {
            req.messages
                == vec![
                    Message::user("hi"),
                    Message::assistant("hello"),
                    Message::user("status?"),
                ]
        })
        .returning(|_| Ok(Completion::text("All good.")));
    let chat = with_provider(service(&dir, Config::default()), provider);

    let history = vec![Message::user("hi"), Message::assistant("hello")];
    let text = chat.reply(&support_agent(), history, "status?").await.unwrap();
    assert_eq!(text, "All good.");
    assert!(chat.sessions().list(None).await.unwrap().is_empty());
}
