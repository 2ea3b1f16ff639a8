//! Remote workflow tools reached over the tool RPC client

use crate::{AgentError, Result};
use agentdesk_mcp::{CallToolResult, CallToolResultExt, McpRegistry};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Calls a tool on a remote server and returns its text output
#[async_trait]
pub trait RemoteToolExecutor: Send + Sync {
    async fn call(&self, server_url: &str, tool_name: &str, arguments: Value) -> Result<String>;
}

#[async_trait]
impl RemoteToolExecutor for McpRegistry {
    async fn call(&self, server_url: &str, tool_name: &str, arguments: Value) -> Result<String> {
        debug!("Calling {} on {}", tool_name, server_url);

        let client = self
            .get_or_create(server_url)
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))?;
        let result = client
            .call_tool(tool_name, arguments)
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))?;

        output_text(&result)
    }
}

/// Text content of a tool result. An `isError` result is a failure.
pub(crate) fn output_text(result: &CallToolResult) -> Result<String> {
    let text = result.text();

    if result.failed() {
        return Err(AgentError::ToolExecution(if text.is_empty() {
            "Tool reported an error".to_string()
        } else {
            text
        }));
    }

    if text.is_empty() {
        return Ok(serde_json::to_string(result)?);
    }
    Ok(text)
}
