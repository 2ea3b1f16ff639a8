//! JSON-RPC 2.0 envelopes and tool payloads
//!
//! Tool, content and error payloads are the `rmcp` model types. Envelopes
//! carry plain numeric ids so responses can be matched against the pending
//! table.

use rmcp::model::{
    ClientCapabilities, ClientInfo, ErrorData, Implementation, JsonRpcVersion2_0, ProtocolVersion,
    RawContent, Tool,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use rmcp::model::{CallToolResult, Content};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool advertised by a server
pub type McpTool = Tool;

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: JsonRpcVersion2_0,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion2_0,
            id,
            method,
            params,
        }
    }
}

/// Request without an id; no response is expected
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<'a> {
    pub jsonrpc: JsonRpcVersion2_0,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> JsonRpcNotification<'a> {
    pub fn new(method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion2_0,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorData>,
}

impl JsonRpcResponse {
    /// Numeric correlation id, if any
    pub fn request_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(Value::as_u64)
    }
}

/// `initialize` parameters for protocol 2024-11-05
pub(crate) fn initialize_params(name: &str, version: &str) -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: ProtocolVersion::V_2024_11_05,
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: name.to_string(),
            title: None,
            version: version.to_string(),
            website_url: None,
            icons: None,
        },
    }
}

/// Tools from a `tools/list` result; a missing list is empty
pub(crate) fn listed_tools(result: Value) -> serde_json::Result<Vec<McpTool>> {
    match result.get("tools") {
        Some(tools) => serde_json::from_value(tools.clone()),
        None => Ok(Vec::new()),
    }
}

/// Convenience accessors on `tools/call` results
pub trait CallToolResultExt {
    /// Text blocks joined by newlines
    fn text(&self) -> String;

    /// Whether the server flagged the call as failed
    fn failed(&self) -> bool;
}

impl CallToolResultExt for CallToolResult {
    fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match &c.raw {
                RawContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn failed(&self) -> bool {
        self.is_error.unwrap_or(false)
    }
}
