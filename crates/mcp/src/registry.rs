//! Shared connections, one per server URL

use crate::client::{McpClient, McpClientOptions};
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Owns tool server connections for the lifetime of the application.
///
/// Connects to one URL are serialized; connects to different URLs run
/// independently.
#[derive(Debug, Default)]
pub struct McpRegistry {
    options: McpClientOptions,
    clients: Mutex<HashMap<String, McpClient>>,
    connecting: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl McpRegistry {
    pub fn new(options: McpClientOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    fn live(&self, server_url: &str) -> Option<McpClient> {
        self.clients
            .lock()
            .get(server_url)
            .filter(|c| c.is_connected())
            .cloned()
    }

    /// Reuse a live connection to `server_url` or open a new one
    pub async fn get_or_create(&self, server_url: &str) -> Result<McpClient> {
        if let Some(client) = self.live(server_url) {
            return Ok(client);
        }

        let gate = self
            .connecting
            .lock()
            .entry(server_url.to_string())
            .or_default()
            .clone();
        let _connecting = gate.lock().await;

        // another caller may have connected while we waited
        if let Some(client) = self.live(server_url) {
            return Ok(client);
        }
        if self.clients.lock().remove(server_url).is_some() {
            debug!("Replacing dead connection to {}", server_url);
        }

        let client = McpClient::connect(server_url, self.options.clone()).await?;
        self.clients
            .lock()
            .insert(server_url.to_string(), client.clone());
        Ok(client)
    }

    pub async fn get(&self, server_url: &str) -> Option<McpClient> {
        self.clients.lock().get(server_url).cloned()
    }

    /// Close every connection and forget them
    pub async fn disconnect_all(&self) {
        let clients: Vec<McpClient> = self.clients.lock().drain().map(|(_, c)| c).collect();
        for client in &clients {
            client.disconnect();
        }
        if !clients.is_empty() {
            debug!("Closed {} tool server connections", clients.len());
        }
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
