//! Common test utilities for AgentDesk integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated home directory; the binary keeps its data under `$HOME/.agentdesk`
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".agentdesk");

        Ok(Self { temp_dir, data_dir })
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Command with HOME pointed at the test environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_agentdesk"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn write_config(&self, config: &serde_json::Value) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::write(
            self.data_file("config.json"),
            serde_json::to_string_pretty(config)?,
        )?;
        Ok(())
    }

    /// One agent, no provider keys
    pub fn create_config(&self) -> anyhow::Result<()> {
        self.write_config(&serde_json::json!({
            "agents": [{
                "id": "support",
                "name": "Support Bot",
                "provider": "openai",
                "model": "gpt-4.1",
                "system_prompt": "You help customers."
            }],
            "tools": [{
                "id": "crm",
                "name": "CRM",
                "kind": "notification",
                "server_url": ""
            }]
        }))
    }

    /// Two agents on different vendors, no provider keys; `support` is the default
    pub fn create_two_agent_config(&self) -> anyhow::Result<()> {
        self.write_config(&serde_json::json!({
            "agents": [
                {
                    "id": "support",
                    "name": "Support Bot",
                    "provider": "openai",
                    "model": "gpt-4.1",
                    "system_prompt": "You help customers."
                },
                {
                    "id": "sales",
                    "name": "Sales Bot",
                    "provider": "anthropic",
                    "model": "claude-sonnet-4-20250514",
                    "system_prompt": "You qualify leads."
                }
            ]
        }))
    }

    /// Empty stored session owned by `agent_id`
    pub fn write_session(&self, id: &str, agent_id: &str) -> anyhow::Result<()> {
        let sessions = self.data_file("sessions");
        std::fs::create_dir_all(&sessions)?;
        std::fs::write(
            sessions.join(format!("{}.json", id)),
            serde_json::to_string_pretty(&serde_json::json!({
                "id": id,
                "agent_id": agent_id,
                "created_at": "2025-01-06T15:04:00+00:00",
                "updated_at": "2025-01-06T15:04:00+00:00",
                "messages": []
            }))?,
        )?;
        Ok(())
    }

    /// Write a file outside the data directory
    pub fn write_file(&self, name: &str, content: &str) -> anyhow::Result<PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
