//! Chat transcripts and knowledge documents
//!
//! Every turn is committed to disk on its own, so a crash mid-conversation
//! keeps everything recorded up to that point.

use agentdesk_config::paths::safe_filename;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub mod knowledge;

pub use knowledge::{KnowledgeDocument, KnowledgeStore, SUPPORTED_FILE_TYPES};

/// Store errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unsupported file type: {0} (supported: pdf, txt, md, json, csv)")]
    UnsupportedFileType(String),

    #[error("could not read text from {0}")]
    Extraction(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Tool,
}

/// Kind of observability turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLabel {
    KnowledgeSearch,
    KnowledgeFound,
    McpResult,
    McpError,
    Thinking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDetails {
    pub tool_name: String,
    #[serde(default)]
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

/// One recorded turn. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_label: Option<ToolLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_details: Option<ToolDetails>,
    pub timestamp: DateTime<Local>,
}

impl ChatMessage {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            tool_label: None,
            tool_details: None,
            timestamp: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn tool(label: ToolLabel, content: impl Into<String>, details: Option<ToolDetails>) -> Self {
        Self {
            tool_label: Some(label),
            tool_details: details,
            ..Self::new(MessageRole::Tool, content)
        }
    }

    pub fn is_tool(&self) -> bool {
        self.role == MessageRole::Tool
    }
}

/// A conversation with one agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub agent_id: String,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        let now = Local::now();
        Self {
            id: id.into(),
            agent_id: agent_id.into(),
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }

    /// Last `limit` user/assistant turns for the provider; tool turns are
    /// observability only and never sent.
    pub fn history(&self, limit: Option<usize>) -> Vec<agentdesk_provider::Message> {
        let turns: Vec<&ChatMessage> = self.messages.iter().filter(|m| !m.is_tool()).collect();
        let skip = limit.map_or(0, |limit| turns.len().saturating_sub(limit));

        turns
            .into_iter()
            .skip(skip)
            .map(|m| match m.role {
                MessageRole::Assistant => agentdesk_provider::Message::assistant(&m.content),
                _ => agentdesk_provider::Message::user(&m.content),
            })
            .collect()
    }

    /// Most recent user or assistant text, for listings
    pub fn preview(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| !m.is_tool())
            .map(|m| m.content.as_str())
    }
}

/// Sessions stored as one JSON file each
pub struct SessionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).ok();

        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Start a new session with a fresh id
    pub async fn create(&self, agent_id: &str) -> Result<ChatSession> {
        let session = ChatSession::new(uuid::Uuid::new_v4().to_string(), agent_id);
        self.save(&session).await?;
        debug!("Created session {} for agent {}", session.id, agent_id);
        Ok(session)
    }

    /// Load `id`, creating it for `agent_id` when absent
    pub async fn get_or_create(&self, id: &str, agent_id: &str) -> Result<ChatSession> {
        let _guard = self.write_lock.lock().await;
        match self.read(id).await? {
            Some(session) => Ok(session),
            None => {
                let session = ChatSession::new(id, agent_id);
                self.save(&session).await?;
                debug!("Created session {} for agent {}", id, agent_id);
                Ok(session)
            }
        }
    }

    pub async fn load(&self, id: &str) -> Result<ChatSession> {
        self.read(id)
            .await?
            .ok_or_else(|| SessionError::NotFound(format!("session {}", id)))
    }

    /// Commit one turn
    pub async fn append(&self, id: &str, message: ChatMessage) -> Result<ChatSession> {
        let _guard = self.write_lock.lock().await;
        let mut session = self.load(id).await?;
        session.push(message);
        self.save(&session).await?;
        Ok(session)
    }

    /// Sessions, most recently updated first
    pub async fn list(&self, agent_id: Option<&str>) -> Result<Vec<ChatSession>> {
        let mut sessions = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<ChatSession>(&content) {
                Ok(session) => {
                    if agent_id.map_or(true, |a| session.agent_id == a) {
                        sessions.push(session);
                    }
                }
                Err(e) => warn!("Skipping unreadable session {:?}: {}", path, e),
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.session_path(id);
        if path.exists() {
            tokio::fs::remove_file(path).await?;
            debug!("Deleted session {}", id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn read(&self, id: &str) -> Result<Option<ChatSession>> {
        let path = self.session_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    async fn save(&self, session: &ChatSession) -> Result<()> {
        let path = self.session_path(&session.id);
        let content = serde_json::to_string_pretty(session)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", safe_filename(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdesk_provider::Message;
    use serde_json::json;

    fn session_with_turns() -> ChatSession {
        let mut session = ChatSession::new("s1", "agent");
        session.push(ChatMessage::user("one"));
        session.push(ChatMessage::tool(ToolLabel::KnowledgeSearch, "Searching knowledge base...", None));
        session.push(ChatMessage::assistant("two"));
        session.push(ChatMessage::user("three"));
        session.push(ChatMessage::tool(ToolLabel::Thinking, "Generated response with gpt-4.1", None));
        session.push(ChatMessage::assistant("four"));
        session
    }

    #[test]
    fn test_history_excludes_tool_turns() {
        let history = session_with_turns().history(None);
        assert_eq!(
            history,
            vec![
                Message::user("one"),
                Message::assistant("two"),
                Message::user("three"),
                Message::assistant("four"),
            ]
        );
    }

    #[test]
    fn test_history_limit_keeps_latest() {
        let history = session_with_turns().history(Some(2));
        assert_eq!(history, vec![Message::user("three"), Message::assistant("four")]);
        assert_eq!(session_with_turns().history(Some(10)).len(), 4);
        assert!(session_with_turns().history(Some(0)).is_empty());
    }

    #[test]
    fn test_preview_skips_tool_turns() {
        let mut session = ChatSession::new("s", "a");
        assert_eq!(session.preview(), None);
        session.push(ChatMessage::user("hello"));
        session.push(ChatMessage::tool(ToolLabel::Thinking, "thinking", None));
        assert_eq!(session.preview(), Some("hello"));
    }

    #[test]
    fn test_tool_message_serialization() {
        let message = ChatMessage::tool(
            ToolLabel::McpResult,
            "create_ticket completed",
            Some(ToolDetails {
                tool_name: "create_ticket".to_string(),
                input: json!({"title": "Broken"}),
                output: Some("ticket 12".to_string()),
                error: None,
                server_url: Some("https://n8n.local/mcp".to_string()),
            }),
        );

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_label"], "mcp_result");
        assert_eq!(value["tool_details"]["output"], "ticket 12");
        assert!(value["tool_details"].get("error").is_none());

        let back: ChatMessage = serde_json::from_value(value).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn test_plain_message_has_no_label() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(value["role"], "user");
        assert!(value.get("tool_label").is_none());
    }
}
