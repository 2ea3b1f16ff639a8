//! LLM provider adapters
//!
//! A vendor-neutral conversation model plus adapters that render it into the
//! OpenAI, Anthropic and Google wire formats and decode the answer back into
//! either a final text or a single tool call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod anthropic;
pub mod factory;
pub mod google;
pub mod openai;
pub mod schema;

pub use anthropic::AnthropicProvider;
pub use factory::create_provider;
pub use google::GoogleProvider;
pub use openai::OpenAiProvider;
pub use schema::sanitize_schema;

/// Text used when a vendor answers without any text content
pub const NO_RESPONSE: &str = "No response";

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Api(String),

    #[error("invalid response from provider")]
    InvalidResponse,

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Supported LLM vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [
        ProviderKind::OpenAi,
        ProviderKind::Anthropic,
        ProviderKind::Google,
    ];

    /// Config id of the vendor
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Google => "google",
        }
    }

    /// Human-readable vendor name, used in error texts
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Google => "Google",
        }
    }

    /// Models offered for this vendor, default first
    pub fn models(&self) -> &'static [&'static str] {
        match self {
            ProviderKind::OpenAi => &["gpt-4.1", "gpt-4.1-mini", "gpt-4o", "gpt-4o-mini"],
            ProviderKind::Anthropic => &[
                "claude-sonnet-4-20250514",
                "claude-3-7-sonnet-20250219",
                "claude-3-5-sonnet-20241022",
                "claude-3-5-haiku-20241022",
            ],
            ProviderKind::Google => &[
                "gemini-2.5-flash",
                "gemini-2.5-flash-lite",
                "gemini-2.5-pro",
                "gemini-2.0-flash",
            ],
        }
    }

    pub fn default_model(&self) -> &'static str {
        self.models()[0]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "google" => Ok(ProviderKind::Google),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Vendor id pairing the call with its result
    pub correlation_token: String,
    pub name: String,
    pub arguments: Value,
    /// Vendor-native assistant turn, echoed on the next request
    pub assistant_turn: Value,
}

/// Output of a tool, keyed back to its invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub correlation_token: String,
    pub tool_name: String,
    pub text: String,
}

/// Vendor-neutral history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    User { text: String },
    Assistant { text: String },
    ToolCall(ToolInvocation),
    ToolResult(ToolResultEnvelope),
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Message::User { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Message::Assistant { text: text.into() }
    }

    pub fn tool_result(
        correlation_token: impl Into<String>,
        tool_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Message::ToolResult(ToolResultEnvelope {
            correlation_token: correlation_token.into(),
            tool_name: tool_name.into(),
            text: text.into(),
        })
    }
}

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// One completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub max_tokens: u32,
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self {
            model: String::new(),
            system: String::new(),
            messages: Vec::new(),
            tools: Vec::new(),
            max_tokens: 4096,
        }
    }
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Final { text: String },
    ToolCall(ToolInvocation),
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Completion::Final { text: text.into() }
    }
}

/// LLM provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Run one completion round
    async fn complete(&self, request: &ChatRequest) -> Result<Completion>;

    fn kind(&self) -> ProviderKind;

    fn default_model(&self) -> String {
        self.kind().default_model().to_string()
    }

    fn is_configured(&self) -> bool;
}

/// Build an object schema of string properties
pub fn object_schema(properties: Vec<(String, String, bool)>) -> Value {
    let mut props = serde_json::Map::new();
    let mut required = Vec::new();

    for (name, description, is_required) in properties {
        props.insert(
            name.clone(),
            serde_json::json!({
                "type": "string",
                "description": description
            }),
        );
        if is_required {
            required.push(name);
        }
    }

    serde_json::json!({
        "type": "object",
        "properties": props,
        "required": required
    })
}

/// Vendor error text from a failed response body
pub(crate) fn api_error(kind: ProviderKind, status: reqwest::StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(str::to_string));

    ProviderError::Api(
        message.unwrap_or_else(|| format!("{} API error: {}", kind.display_name(), status.as_u16())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========== ProviderKind Tests ==========

    #[test]
    fn test_provider_kind_from_str() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!(" google ".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
    }

    #[test]
    fn test_provider_kind_unknown() {
        let err = "mistral".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedProvider(ref p) if p == "mistral"));
    }

    #[test]
    fn test_provider_kind_default_models() {
        assert_eq!(ProviderKind::OpenAi.default_model(), "gpt-4.1");
        assert_eq!(
            ProviderKind::Anthropic.default_model(),
            "claude-sonnet-4-20250514"
        );
        assert_eq!(ProviderKind::Google.default_model(), "gemini-2.5-flash");
        for kind in ProviderKind::ALL {
            assert_eq!(kind.models().len(), 4);
            assert_eq!(kind.id().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_provider_kind_serde() {
        assert_eq!(serde_json::to_value(ProviderKind::OpenAi).unwrap(), json!("openai"));
        let kind: ProviderKind = serde_json::from_value(json!("google")).unwrap();
        assert_eq!(kind, ProviderKind::Google);
    }

    // ========== Message Tests ==========

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi"), Message::User { text: "hi".to_string() });
        assert_eq!(
            Message::assistant("hello"),
            Message::Assistant { text: "hello".to_string() }
        );
        match Message::tool_result("call_1", "lookup", "42") {
            Message::ToolResult(env) => {
                assert_eq!(env.correlation_token, "call_1");
                assert_eq!(env.tool_name, "lookup");
                assert_eq!(env.text, "42");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    // ========== Error Tests ==========

    #[test]
    fn test_api_error_uses_vendor_message() {
        let err = api_error(
            ProviderKind::OpenAi,
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"Incorrect API key provided"}}"#,
        );
        assert_eq!(err.to_string(), "Incorrect API key provided");
    }

    #[test]
    fn test_api_error_falls_back_to_status() {
        let err = api_error(
            ProviderKind::Google,
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "<html>oops</html>",
        );
        assert_eq!(err.to_string(), "Google API error: 500");
    }

    // ========== object_schema Tests ==========

    #[test]
    fn test_object_schema() {
        let schema = object_schema(vec![
            ("query".to_string(), "Search text".to_string(), true),
            ("limit".to_string(), "Max hits".to_string(), false),
        ]);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["required"], json!(["query"]));
    }
}
