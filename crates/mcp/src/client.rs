//! Tool server client over SSE + HTTP POST
//!
//! The server pushes an `endpoint` event telling the client where to POST
//! JSON-RPC requests; responses come back as `message` events on the same
//! stream and are matched to callers through the pending table.

use crate::error::{McpError, Result};
use crate::pending::PendingRequests;
use crate::protocol::{
    initialize_params, listed_tools, CallToolResult, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, McpTool,
};
use crate::sse::{SseDecoder, SseEvent};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Connection state changes reported to the owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected { endpoint: String },
    Disconnected { reason: String },
}

pub type EventCallback = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;

#[derive(Clone)]
pub struct McpClientOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub client_name: String,
    pub client_version: String,
    pub on_event: Option<EventCallback>,
}

impl Default for McpClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            client_name: "agentdesk".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            on_event: None,
        }
    }
}

impl McpClientOptions {
    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    pub fn on_event(mut self, callback: impl Fn(ConnectionEvent) + Send + Sync + 'static) -> Self {
        self.on_event = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for McpClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClientOptions")
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("client_name", &self.client_name)
            .field("on_event", &self.on_event.is_some())
            .finish()
    }
}

/// Connection to one tool server. Cheap to clone; clones share the stream.
#[derive(Clone)]
pub struct McpClient {
    inner: Arc<Inner>,
}

struct Inner {
    server_url: String,
    stream_url: Url,
    http: reqwest::Client,
    options: McpClientOptions,
    endpoint: Mutex<Option<Url>>,
    endpoint_ready: Mutex<Option<oneshot::Sender<()>>>,
    pending: PendingRequests,
    connected: AtomicBool,
    shutdown: CancellationToken,
}

impl McpClient {
    /// Open the event stream, wait for the message endpoint and run the
    /// initialize handshake.
    pub async fn connect(server_url: &str, options: McpClientOptions) -> Result<Self> {
        let (inner, endpoint_rx) = Inner::new(server_url, options)?;
        let inner = Arc::new(inner);
        let connect_timeout = inner.options.connect_timeout;

        info!("Connecting to tool server {}", inner.server_url);

        let opened = tokio::time::timeout(connect_timeout, async {
            let response = inner
                .http
                .get(inner.stream_url.clone())
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .send()
                .await
                .map_err(|e| McpError::connection(format!("failed to open event stream: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(McpError::connection(format!(
                    "event stream returned HTTP {}",
                    status.as_u16()
                )));
            }

            tokio::spawn(read_stream(inner.clone(), response.bytes_stream()));

            endpoint_rx.await.map_err(|_| {
                McpError::connection("event stream closed before announcing an endpoint")
            })
        })
        .await;

        match opened {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                inner.shutdown.cancel();
                return Err(e);
            }
            Err(_) => {
                inner.shutdown.cancel();
                return Err(McpError::connection(format!(
                    "timed out after {:?} waiting for endpoint event",
                    connect_timeout
                )));
            }
        }

        inner.connected.store(true, Ordering::SeqCst);
        let client = McpClient { inner };

        if let Err(e) = client.initialize().await {
            warn!("Handshake with {} failed: {}", client.server_url(), e);
            client.disconnect();
            return Err(e);
        }

        if let Some(endpoint) = client.inner.message_endpoint() {
            client.inner.emit(ConnectionEvent::Connected {
                endpoint: endpoint.to_string(),
            });
        }
        info!("Connected to tool server {}", client.server_url());
        Ok(client)
    }

    async fn initialize(&self) -> Result<()> {
        let params = initialize_params(
            &self.inner.options.client_name,
            &self.inner.options.client_version,
        );
        let result = self
            .request("initialize", serde_json::to_value(params)?)
            .await?;
        debug!(
            "Initialized with server {}",
            result["serverInfo"]["name"].as_str().unwrap_or("unknown")
        );

        self.notify("notifications/initialized", json!({})).await
    }

    /// Tools advertised by the server
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let result = self.request("tools/list", json!({})).await?;
        if result.is_null() {
            return Ok(Vec::new());
        }
        let tools = listed_tools(result)?;
        debug!("Server {} lists {} tools", self.server_url(), tools.len());
        Ok(tools)
    }

    /// Invoke a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        debug!("Calling tool {} on {}", name, self.server_url());
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        if result.is_null() {
            return Ok(CallToolResult::success(Vec::new()));
        }
        Ok(serde_json::from_value(result)?)
    }

    /// Send a correlated request and wait for its response
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let inner = &self.inner;
        let endpoint = inner.usable_endpoint()?;

        let id = inner.pending.next_id();
        let response = inner.pending.register(id);
        let after = inner.options.request_timeout;
        trace!("Request {} id={} -> {}", method, id, endpoint);

        let outcome = tokio::time::timeout(after, async {
            inner.post(&endpoint, &JsonRpcRequest::new(id, method, params)).await?;
            response.await.map_err(|_| McpError::Cancelled)?
        })
        .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                inner.pending.remove(id);
                Err(e)
            }
            Err(_) => {
                inner.pending.remove(id);
                debug!("Request {} id={} timed out", method, id);
                Err(McpError::Timeout {
                    method: method.to_string(),
                    after,
                })
            }
        }
    }

    /// Fire-and-forget notification
    pub async fn notify(&self, method: &str, params: Value) -> Result<()> {
        let endpoint = self.inner.usable_endpoint()?;
        self.inner
            .post(&endpoint, &JsonRpcNotification::new(method, params))
            .await
    }

    /// Stop the stream and cancel pending requests. Idempotent.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        inner.shutdown.cancel();
        inner.endpoint.lock().take();

        let cancelled = inner.pending.fail_all(|| McpError::Cancelled);
        if cancelled > 0 {
            debug!("Cancelled {} pending requests", cancelled);
        }

        if inner.connected.swap(false, Ordering::SeqCst) {
            info!("Disconnected from tool server {}", inner.server_url);
            inner.emit(ConnectionEvent::Disconnected {
                reason: "closed by client".to_string(),
            });
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    pub fn server_url(&self) -> &str {
        &self.inner.server_url
    }

    pub fn message_endpoint(&self) -> Option<String> {
        self.inner.message_endpoint().map(|u| u.to_string())
    }

    pub fn pending_requests(&self) -> usize {
        self.inner.pending.len()
    }
}

impl fmt::Debug for McpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpClient")
            .field("server_url", &self.inner.server_url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Inner {
    fn new(server_url: &str, options: McpClientOptions) -> Result<(Self, oneshot::Receiver<()>)> {
        let server_url = server_url.trim().trim_end_matches('/').to_string();
        let stream_url = Url::parse(&server_url)
            .map_err(|e| McpError::connection(format!("invalid server url {}: {}", server_url, e)))?;
        let (ready_tx, ready_rx) = oneshot::channel();

        let inner = Self {
            server_url,
            stream_url,
            http: reqwest::Client::new(),
            options,
            endpoint: Mutex::new(None),
            endpoint_ready: Mutex::new(Some(ready_tx)),
            pending: PendingRequests::new(),
            connected: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        };
        Ok((inner, ready_rx))
    }

    fn message_endpoint(&self) -> Option<Url> {
        self.endpoint.lock().clone()
    }

    fn usable_endpoint(&self) -> Result<Url> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::connection("not connected"));
        }
        self.message_endpoint()
            .ok_or_else(|| McpError::connection("no message endpoint"))
    }

    async fn post<T: Serialize>(&self, endpoint: &Url, body: &T) -> Result<()> {
        let response = self
            .http
            .post(endpoint.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| McpError::connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::Protocol {
                code: i64::from(status.as_u16()),
                message: format!("HTTP {}: {}", status.as_u16(), text),
            });
        }
        Ok(())
    }

    fn handle_event(&self, event: SseEvent) {
        match event.event.as_str() {
            "endpoint" => self.handle_endpoint(event.data.trim()),
            "message" => self.handle_message(&event.data),
            other => trace!("Ignoring {} event", other),
        }
    }

    fn handle_endpoint(&self, data: &str) {
        if data.is_empty() {
            return;
        }
        match self.stream_url.join(data) {
            Ok(endpoint) => {
                debug!("Message endpoint: {}", endpoint);
                *self.endpoint.lock() = Some(endpoint);
                if let Some(ready) = self.endpoint_ready.lock().take() {
                    let _ = ready.send(());
                }
            }
            Err(e) => warn!("Unusable endpoint {:?}: {}", data, e),
        }
    }

    fn handle_message(&self, data: &str) {
        let response: JsonRpcResponse = match serde_json::from_str(data) {
            Ok(response) => response,
            Err(e) => {
                warn!("Dropping unparseable message: {}", e);
                return;
            }
        };

        let Some(id) = response.request_id() else {
            trace!("Dropping message without numeric id");
            return;
        };

        let outcome = match response.error {
            Some(error) => Err(McpError::Protocol {
                code: i64::from(error.code.0),
                message: error.message.into_owned(),
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };

        if !self.pending.resolve(id, outcome) {
            debug!("Ignoring response for unknown or settled id {}", id);
        }
    }

    /// Stream ended or failed on its own
    fn connection_lost(&self, reason: String) {
        self.endpoint.lock().take();
        self.endpoint_ready.lock().take();

        let failed = self
            .pending
            .fail_all(|| McpError::connection(reason.clone()));

        if self.connected.swap(false, Ordering::SeqCst) {
            warn!(
                "Lost connection to {}: {} ({} pending failed)",
                self.server_url, reason, failed
            );
            self.emit(ConnectionEvent::Disconnected { reason });
        } else {
            debug!("Event stream for {} ended: {}", self.server_url, reason);
        }
    }

    fn emit(&self, event: ConnectionEvent) {
        if let Some(callback) = &self.options.on_event {
            callback(event);
        }
    }
}

async fn read_stream<S, B>(inner: Arc<Inner>, stream: S)
where
    S: Stream<Item = reqwest::Result<B>>,
    B: AsRef<[u8]>,
{
    futures::pin_mut!(stream);
    let mut decoder = SseDecoder::new();

    let reason = loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => return,
            chunk = stream.next() => match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.feed(bytes.as_ref()) {
                        inner.handle_event(event);
                    }
                }
                Some(Err(e)) => break format!("event stream error: {}", e),
                None => break "event stream closed".to_string(),
            },
        }
    };

    inner.connection_lost(reason);
}
