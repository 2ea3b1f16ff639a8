//! Tool server client
//!
//! JSON-RPC 2.0 over a server-sent event stream, with requests submitted by
//! HTTP POST to the endpoint the server announces.

pub mod client;
pub mod error;
pub mod pending;
pub mod protocol;
pub mod registry;
pub mod sse;

pub use client::{ConnectionEvent, McpClient, McpClientOptions};
pub use error::{McpError, Result};
pub use protocol::{CallToolResult, CallToolResultExt, Content, McpTool};
pub use registry::McpRegistry;
