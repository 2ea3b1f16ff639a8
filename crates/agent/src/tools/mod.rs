//! Tool catalog offered to the model

pub mod knowledge;
pub mod remote;

pub use knowledge::{knowledge_tool_spec, KnowledgeBase, KNOWLEDGE_TOOL_NAME};
pub use remote::RemoteToolExecutor;

use agentdesk_config::{AgentProfile, ToolServer, ToolServerKind};
use agentdesk_provider::ToolSpec;
use tracing::debug;

/// Where a catalog entry is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOrigin {
    KnowledgeBase,
    Remote { server_url: String, tool_id: String },
}

impl ToolOrigin {
    pub fn server_url(&self) -> Option<&str> {
        match self {
            ToolOrigin::Remote { server_url, .. } => Some(server_url),
            ToolOrigin::KnowledgeBase => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub spec: ToolSpec,
    pub origin: ToolOrigin,
}

/// Tools available to one request, in offer order. Names are unique.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    entries: Vec<CatalogEntry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Knowledge tool when documents exist, then the agent's remote tools
    /// resolved against configured workflow servers.
    pub fn build(agent: &AgentProfile, servers: &[ToolServer], has_knowledge: bool) -> Self {
        let mut catalog = Self::new();

        if has_knowledge {
            catalog.register(CatalogEntry {
                spec: knowledge_tool_spec(),
                origin: ToolOrigin::KnowledgeBase,
            });
        }

        for tool_ref in &agent.tools {
            let Some(server) = servers
                .iter()
                .find(|s| s.id == tool_ref.tool_id && s.kind == ToolServerKind::N8n)
            else {
                debug!("Skipping {}: no workflow server {}", tool_ref.tool_name, tool_ref.tool_id);
                continue;
            };
            let Some(def) = server
                .available_tools
                .iter()
                .find(|t| t.name == tool_ref.tool_name)
            else {
                debug!("Skipping {}: not advertised by {}", tool_ref.tool_name, server.id);
                continue;
            };

            catalog.register(CatalogEntry {
                spec: ToolSpec::new(&def.name, &def.description, def.input_schema.clone()),
                origin: ToolOrigin::Remote {
                    server_url: server.server_url.clone(),
                    tool_id: server.id.clone(),
                },
            });
        }

        catalog
    }

    /// Add an entry; the first entry with a given name wins.
    pub fn register(&mut self, entry: CatalogEntry) -> bool {
        if self.get(&entry.spec.name).is_some() {
            debug!("Duplicate tool name {} ignored", entry.spec.name);
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.spec.name == name)
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.entries.iter().map(|e| e.spec.clone()).collect()
    }

    pub fn has_knowledge(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.origin == ToolOrigin::KnowledgeBase)
    }

    pub fn remote_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| matches!(e.origin, ToolOrigin::Remote { .. }))
            .map(|e| e.spec.name.as_str())
            .collect()
    }

    /// System prompt suffix describing the available tools
    pub fn hints(&self) -> String {
        let mut hints = String::new();

        if self.has_knowledge() {
            hints.push_str(
                "\n\nYou have access to a knowledge base. Use the search_knowledge_base tool \
                 when you need to look up specific information.",
            );
        }

        let remote = self.remote_names();
        if !remote.is_empty() {
            hints.push_str(&format!(
                "\n\nYou have access to the following tools: {}. Use them when appropriate to help the user.",
                remote.join(", ")
            ));
        }

        hints
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
