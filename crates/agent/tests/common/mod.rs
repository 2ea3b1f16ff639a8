//! Shared mocks for agent tests

#![allow(dead_code)]

use agentdesk_agent::RemoteToolExecutor;
use agentdesk_provider::{
    ChatRequest, Completion, Message, Provider, ProviderError, ProviderKind, ToolInvocation,
};
use async_trait::async_trait;
use chrono::Local;
use agentdesk_session::KnowledgeDocument;
use mockall::mock;
use serde_json::{json, Value};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError>;
        fn kind(&self) -> ProviderKind;
        fn is_configured(&self) -> bool;
    }
}

mock! {
    pub Remote {}

    #[async_trait]
    impl RemoteToolExecutor for Remote {
        async fn call(
            &self,
            server_url: &str,
            tool_name: &str,
            arguments: Value,
        ) -> agentdesk_agent::Result<String>;
    }
}

/// A tool call completion as an adapter would report it
pub fn tool_call(token: &str, name: &str, arguments: Value) -> Completion {
    Completion::ToolCall(ToolInvocation {
        correlation_token: token.to_string(),
        name: name.to_string(),
        arguments: arguments.clone(),
        assistant_turn: json!({"role": "assistant", "tool_calls": [{"id": token}]}),
    })
}

/// Text of the last tool result in a request, if any
pub fn last_tool_result(request: &ChatRequest) -> Option<String> {
    request.messages.iter().rev().find_map(|m| match m {
        Message::ToolResult(result) => Some(result.text.clone()),
        _ => None,
    })
}

pub fn document(file_name: &str, content: &str) -> KnowledgeDocument {
    KnowledgeDocument {
        id: file_name.to_string(),
        agent_id: "support".to_string(),
        file_name: file_name.to_string(),
        file_type: "txt".to_string(),
        file_size: content.len() as u64,
        content: content.to_string(),
        created_at: Local::now(),
    }
}
