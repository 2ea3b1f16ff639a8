//! Knowledge documents uploaded for an agent

use crate::{Result, SessionError};
use agentdesk_config::paths::safe_filename;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File extensions accepted as knowledge; PDFs are stored as their extracted text
pub const SUPPORTED_FILE_TYPES: &[&str] = &["pdf", "txt", "md", "json", "csv"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDocument {
    pub id: String,
    pub agent_id: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub content: String,
    pub created_at: DateTime<Local>,
}

/// Documents stored under `<dir>/<agent_id>/<doc_id>.json`
pub struct KnowledgeStore {
    dir: PathBuf,
}

impl KnowledgeStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    /// Store text content under `file_name`
    pub async fn add(
        &self,
        agent_id: &str,
        file_name: &str,
        content: impl Into<String>,
    ) -> Result<KnowledgeDocument> {
        let file_type = file_type_of(file_name)?;
        let content = content.into();
        let file_size = content.len() as u64;
        self.store(agent_id, file_name, file_type, file_size, content)
            .await
    }

    /// Read a file from disk and store its text
    pub async fn add_file(&self, agent_id: &str, path: &Path) -> Result<KnowledgeDocument> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SessionError::NotFound(path.display().to_string()))?;
        let file_type = file_type_of(file_name)?;

        if !path.exists() {
            return Err(SessionError::NotFound(path.display().to_string()));
        }
        let bytes = tokio::fs::read(path).await?;
        let file_size = bytes.len() as u64;
        let content = if file_type == "pdf" {
            pdf_text(file_name, bytes).await?
        } else {
            String::from_utf8(bytes).map_err(|_| {
                SessionError::Extraction(format!("{} is not valid UTF-8 text", file_name))
            })?
        };

        self.store(agent_id, file_name, file_type, file_size, content)
            .await
    }

    async fn store(
        &self,
        agent_id: &str,
        file_name: &str,
        file_type: String,
        file_size: u64,
        content: String,
    ) -> Result<KnowledgeDocument> {
        let document = KnowledgeDocument {
            id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.to_string(),
            file_name: file_name.to_string(),
            file_type,
            file_size,
            content,
            created_at: Local::now(),
        };

        let agent_dir = self.agent_dir(agent_id);
        tokio::fs::create_dir_all(&agent_dir).await?;
        let path = agent_dir.join(format!("{}.json", document.id));
        tokio::fs::write(&path, serde_json::to_string_pretty(&document)?).await?;

        debug!(
            "Stored knowledge document {} ({} bytes) for agent {}",
            document.file_name, document.file_size, agent_id
        );
        Ok(document)
    }

    /// Documents for an agent, oldest first
    pub async fn list(&self, agent_id: &str) -> Result<Vec<KnowledgeDocument>> {
        let agent_dir = self.agent_dir(agent_id);
        if !agent_dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        let mut entries = tokio::fs::read_dir(&agent_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<KnowledgeDocument>(&content) {
                Ok(document) => documents.push(document),
                Err(e) => warn!("Skipping unreadable document {:?}: {}", path, e),
            }
        }

        documents.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(documents)
    }

    pub async fn delete(&self, agent_id: &str, document_id: &str) -> Result<bool> {
        let path = self
            .agent_dir(agent_id)
            .join(format!("{}.json", safe_filename(document_id)));
        if path.exists() {
            tokio::fs::remove_file(path).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.dir.join(safe_filename(agent_id))
    }
}

/// Text of every page, pages separated by blank lines
async fn pdf_text(file_name: &str, bytes: Vec<u8>) -> Result<String> {
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| SessionError::Extraction(format!("{}: {}", file_name, e)))?;

    let text = extracted.map_err(|e| SessionError::Extraction(format!("{}: {}", file_name, e)))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(SessionError::Extraction(format!(
            "{}: no extractable text",
            file_name
        )));
    }
    Ok(text.to_string())
}

fn file_type_of(file_name: &str) -> Result<String> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if SUPPORTED_FILE_TYPES.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(SessionError::UnsupportedFileType(file_name.to_string()))
    }
}
