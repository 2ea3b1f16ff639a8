//! In-process tool server speaking JSON-RPC over SSE

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct ServerState {
    sender: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    received: Mutex<Vec<Value>>,
}

impl ServerState {
    fn push(&self, payload: Value) {
        if let Some(tx) = self.sender.lock().as_ref() {
            let _ = tx.send(Event::default().event("message").data(payload.to_string()));
        }
    }
}

pub struct TestServer {
    base: String,
    state: Arc<ServerState>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/sse", get(sse_handler))
            .route("/sse-bad-endpoint", get(bad_endpoint_handler))
            .route("/silent", get(silent_handler))
            .route("/closed", get(closed_handler))
            .route("/messages", post(message_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base: format!("http://{}", addr),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().clone()
    }

    pub fn count_method(&self, method: &str) -> usize {
        self.received()
            .iter()
            .filter(|m| m["method"] == method)
            .count()
    }

    pub fn count_calls(&self, tool: &str) -> usize {
        self.received()
            .iter()
            .filter(|m| m["method"] == "tools/call" && m["params"]["name"] == tool)
            .count()
    }
}

/// Poll `condition` for up to two seconds
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

fn event_stream(
    rx: mpsc::UnboundedReceiver<Event>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|event| (Ok(event), rx))
    });
    Sse::new(stream)
}

fn open_stream(state: &ServerState, endpoint: Option<&str>) -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(endpoint) = endpoint {
        let _ = tx.send(Event::default().event("endpoint").data(endpoint));
    }
    *state.sender.lock() = Some(tx);
    rx
}

async fn sse_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(open_stream(&state, Some("/messages?sessionId=test")))
}

async fn bad_endpoint_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(open_stream(&state, Some("/nowhere")))
}

async fn silent_handler(
    State(state): State<Arc<ServerState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    event_stream(open_stream(&state, None))
}

async fn closed_handler() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (_tx, rx) = mpsc::unbounded_channel();
    event_stream(rx)
}

async fn message_handler(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    state.received.lock().push(body.clone());

    let Some(id) = body.get("id").cloned() else {
        return StatusCode::ACCEPTED;
    };

    let result = |result: Value| json!({"jsonrpc": "2.0", "id": id, "result": result});
    let error = |code: i64, message: String| {
        json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
    };

    match body["method"].as_str().unwrap_or_default() {
        "initialize" => state.push(result(json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "test-server", "version": "1.0.0"}
        }))),
        "tools/list" => state.push(result(json!({
            "tools": [
                {
                    "name": "echo",
                    "description": "Echo the given text",
                    "inputSchema": {
                        "type": "object",
                        "properties": {"text": {"type": "string"}},
                        "required": ["text"]
                    }
                },
                {"name": "slow", "inputSchema": {"type": "object"}}
            ]
        }))),
        "tools/call" => {
            let name = body["params"]["name"].as_str().unwrap_or_default().to_string();
            match name.as_str() {
                "echo" => {
                    let text = body["params"]["arguments"]["text"].clone();
                    state.push(result(json!({"content": [{"type": "text", "text": text}]})));
                }
                "fail" => state.push(result(json!({
                    "content": [{"type": "text", "text": "bad input"}],
                    "isError": true
                }))),
                "twice" => {
                    state.push(result(json!({"content": [{"type": "text", "text": "first"}]})));
                    state.push(result(json!({"content": [{"type": "text", "text": "second"}]})));
                }
                "slow" => {}
                "hangup" => {
                    state.sender.lock().take();
                }
                other => state.push(error(-32602, format!("Unknown tool: {}", other))),
            }
        }
        _ => state.push(error(-32601, "Method not found".to_string())),
    }

    StatusCode::ACCEPTED
}
