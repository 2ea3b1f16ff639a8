//! Inbound webhook server

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::bridge::{BridgeOutcome, InboundWhatsApp, WhatsAppBridge};
use crate::Result;

/// Twilio posts many more fields; only these are read
#[derive(Debug, Default, Deserialize)]
struct WebhookForm {
    #[serde(rename = "From")]
    from: Option<String>,
    #[serde(rename = "To")]
    to: Option<String>,
    #[serde(rename = "Body")]
    body: Option<String>,
}

pub fn router(bridge: Arc<WhatsAppBridge>) -> Router {
    Router::new()
        .route("/whatsapp", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(bridge)
}

/// Serve until `shutdown` resolves
pub async fn serve(
    bridge: Arc<WhatsAppBridge>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Webhook listening on {}", listener.local_addr()?);

    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn verify() -> &'static str {
    "Webhook is active"
}

async fn receive(
    State(bridge): State<Arc<WhatsAppBridge>>,
    Form(form): Form<WebhookForm>,
) -> impl IntoResponse {
    let (Some(from), Some(body)) = (form.from, form.body) else {
        return (StatusCode::BAD_REQUEST, "Missing required fields");
    };
    if from.trim().is_empty() || body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing required fields");
    }

    let inbound = InboundWhatsApp {
        from,
        to: form.to.unwrap_or_default(),
        body,
    };

    match bridge.handle(inbound).await {
        Ok(BridgeOutcome::Replied { agent_id, .. }) => {
            info!("Replied on WhatsApp as {}", agent_id);
            (StatusCode::OK, "OK")
        }
        // 200 keeps Twilio from retrying
        Ok(BridgeOutcome::Ignored(reason)) => {
            info!("WhatsApp message ignored: {}", reason);
            (StatusCode::OK, "OK")
        }
        Err(e) => {
            error!("Error processing WhatsApp message: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
