//! Path utilities

use std::path::{Path, PathBuf};

/// Data directory (~/.agentdesk)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .expect("failed to locate home directory")
        .join(".agentdesk")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Chat session transcripts
pub fn sessions_dir() -> PathBuf {
    data_dir().join("sessions")
}

/// Uploaded knowledge documents
pub fn knowledge_dir() -> PathBuf {
    data_dir().join("knowledge")
}

/// Create a directory and its parents
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// Sanitize a name for use as a single path component
///
/// Dots are replaced too, so `..` can never name a parent directory.
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' | '+' | ' ' | '.' => '_',
            _ => c,
        })
        .collect()
}
