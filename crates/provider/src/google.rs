//! Google Gemini generateContent adapter

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GoogleProvider {
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
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|message| match message {
                Message::User { text } => json!({ "role": "user", "parts": [{ "text": text }] }),
                Message::Assistant { text } => {
                    json!({ "role": "model", "parts": [{ "text": text }] })
                }
                Message::ToolCall(call) => call.assistant_turn.clone(),
                Message::ToolResult(result) => json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": &result.tool_name,
                            "response": { "content": &result.text }
                        }
                    }]
                }),
            })
            .collect();

        let mut body = json!({ "contents": contents });

        if !request.system.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": &request.system }] });
        }

        if !request.tools.is_empty() {
            let declarations: Vec<Value> = request
                .tools
                .iter()
                .map(|t| {
                    json!({
                        "name": &t.name,
                        "description": &t.description,
                        "parameters": sanitize_schema(&t.input_schema)
                    })
                })
                .collect();
            body["tools"] = json!([{ "functionDeclarations": declarations }]);
        }

        body
    }

    fn parse_response(&self, json: Value) -> Result<Completion> {
        let content = json["candidates"]
            .get(0)
            .map(|candidate| &candidate["content"])
            .ok_or(ProviderError::InvalidResponse)?;
        let parts = content["parts"].as_array().cloned().unwrap_or_default();

        if let Some(index) = parts.iter().position(|p| p.get("functionCall").is_some()) {
            let call = &parts[index]["functionCall"];
            let name = call["name"].as_str().unwrap_or_default().to_string();
            let correlation_token = call["id"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| name.clone());
            let arguments = match &call["args"] {
                Value::Object(_) => call["args"].clone(),
                _ => json!({}),
            };

            let echoed: Vec<Value> = parts
                .iter()
                .enumerate()
                .filter(|(i, p)| *i == index || p.get("functionCall").is_none())
                .map(|(_, p)| p.clone())
                .collect();

            return Ok(Completion::ToolCall(ToolInvocation {
                correlation_token,
                name,
                arguments,
                assistant_turn: json!({ "role": "model", "parts": echoed }),
            }));
        }

        let text: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.is_empty() {
            return Ok(Completion::text(NO_RESPONSE));
        }
        Ok(Completion::text(text.join("")))
    }
}

#[async_trait]
impl Provider for GoogleProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        trace!("Google request to {} ({})", self.api_base, request.model);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, request.model
        );
        let body = self.build_request(request);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(ProviderKind::Google, status, &text));
        }

        let json: Value = serde_json::from_str(&text)?;
        debug!(
            "Google response: finishReason={}",
            json["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown")
        );

        self.parse_response(json)
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
