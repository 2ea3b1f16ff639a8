//! OpenAI chat completions adapter

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// OpenAI provider
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl OpenAiProvider {
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
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        if !request.system.is_empty() {
            messages.push(json!({ "role": "system", "content": &request.system }));
        }

        for message in &request.messages {
            messages.push(match message {
                Message::User { text } => json!({ "role": "user", "content": text }),
                Message::Assistant { text } => json!({ "role": "assistant", "content": text }),
                Message::ToolCall(call) => call.assistant_turn.clone(),
                Message::ToolResult(result) => json!({
                    "role": "tool",
                    "tool_call_id": &result.correlation_token,
                    "content": &result.text,
                }),
            });
        }

        let mut body = json!({
            "model": &request.model,
            "messages": messages,
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": &t.name,
                            "description": &t.description,
                            "parameters": &t.input_schema
                        }
                    })
                })
                .collect();
            body["tools"] = json!(tools);
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<Completion> {
        let message = json["choices"]
            .get(0)
            .map(|choice| &choice["message"])
            .ok_or(ProviderError::InvalidResponse)?;

        if let Some(call) = message["tool_calls"].as_array().and_then(|c| c.first()) {
            let function = &call["function"];
            let arguments = match &function["arguments"] {
                Value::String(raw) => serde_json::from_str(raw).unwrap_or_else(|_| json!({})),
                Value::Object(_) => function["arguments"].clone(),
                _ => json!({}),
            };

            let mut assistant_turn = message.clone();
            assistant_turn["role"] = json!("assistant");
            assistant_turn["tool_calls"] = json!([call]);

            return Ok(Completion::ToolCall(ToolInvocation {
                correlation_token: call["id"].as_str().unwrap_or_default().to_string(),
                name: function["name"].as_str().unwrap_or_default().to_string(),
                arguments,
                assistant_turn,
            }));
        }

        let text = message["content"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_RESPONSE);
        Ok(Completion::text(text))
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        trace!("OpenAI request to {} ({})", self.api_base, request.model);

        let url = format!("{}/chat/completions", self.api_base);
        let body = self.build_request(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(ProviderKind::OpenAi, status, &text));
        }

        let json: Value = serde_json::from_str(&text)?;
        debug!(
            "OpenAI response: {} tool calls",
            json["choices"][0]["message"]["tool_calls"]
                .as_array()
                .map(|v| v.len())
                .unwrap_or(0)
        );

        self.parse_response(json)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
