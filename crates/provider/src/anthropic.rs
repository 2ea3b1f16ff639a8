//! Anthropic messages adapter

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic provider
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, api_base: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base: api_base
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        }
    }

    fn build_request(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| match message {
                Message::User { text } => json!({ "role": "user", "content": text }),
                Message::Assistant { text } => json!({ "role": "assistant", "content": text }),
                Message::ToolCall(call) => json!({
                    "role": "assistant",
                    "content": &call.assistant_turn,
                }),
                Message::ToolResult(result) => json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": &result.correlation_token,
                        "content": &result.text,
                    }]
                }),
            })
            .collect();

        let mut body = json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "messages": messages,
        });

        if !request.system.is_empty() {
            body["system"] = json!(&request.system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": &t.name,
                        "description": &t.description,
                        "input_schema": &t.input_schema
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<Completion> {
        let blocks = json["content"]
            .as_array()
            .ok_or(ProviderError::InvalidResponse)?;

        if let Some(tool_use) = blocks.iter().find(|b| b["type"] == "tool_use") {
            // Echo text blocks plus the one tool_use block being answered.
            let assistant_turn: Vec<Value> = blocks
                .iter()
                .filter(|b| b["type"] != "tool_use" || std::ptr::eq(*b, tool_use))
                .cloned()
                .collect();

            return Ok(Completion::ToolCall(ToolInvocation {
                correlation_token: tool_use["id"].as_str().unwrap_or_default().to_string(),
                name: tool_use["name"].as_str().unwrap_or_default().to_string(),
                arguments: match &tool_use["input"] {
                    Value::Object(_) => tool_use["input"].clone(),
                    _ => json!({}),
                },
                assistant_turn: Value::Array(assistant_turn),
            }));
        }

        let text = blocks
            .iter()
            .find(|b| b["type"] == "text")
            .and_then(|b| b["text"].as_str())
            .unwrap_or(NO_RESPONSE);
        Ok(Completion::text(text))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        trace!("Anthropic request to {} ({})", self.api_base, request.model);

        let url = format!("{}/v1/messages", self.api_base);
        let body = self.build_request(request);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(ProviderKind::Anthropic, status, &text));
        }

        let json: Value = serde_json::from_str(&text)?;
        debug!(
            "Anthropic response: stop_reason={}",
            json["stop_reason"].as_str().unwrap_or("unknown")
        );

        self.parse_response(json)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
