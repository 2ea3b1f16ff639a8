//! Built-in knowledge base search

use agentdesk_provider::{object_schema, ToolSpec};
use agentdesk_session::KnowledgeDocument;

pub const KNOWLEDGE_TOOL_NAME: &str = "search_knowledge_base";

pub fn knowledge_tool_spec() -> ToolSpec {
    ToolSpec::new(
        KNOWLEDGE_TOOL_NAME,
        "Search the knowledge base for relevant information to answer the user's question. \
         Use this when you need specific information or facts that might be in the uploaded documents.",
        object_schema(vec![(
            "query".to_string(),
            "The search query to find relevant information".to_string(),
            true,
        )]),
    )
}

/// An agent's documents, as offered to the model.
///
/// Search returns every document; the model does the relevance filtering.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: Vec<KnowledgeDocument>,
}

impl KnowledgeBase {
    pub fn new(documents: Vec<KnowledgeDocument>) -> Self {
        Self { documents }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn search(&self, _query: &str) -> String {
        if self.documents.is_empty() {
            return "No documents found in knowledge base.".to_string();
        }

        self.documents
            .iter()
            .map(|doc| format!("--- {} ---\n{}", doc.file_name, doc.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn found_message(&self) -> String {
        match self.documents.len() {
            1 => "Found 1 document in knowledge base".to_string(),
            n => format!("Found {} documents in knowledge base", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use serde_json::json;

    fn doc(name: &str, content: &str) -> KnowledgeDocument {
        KnowledgeDocument {
            id: name.to_string(),
            agent_id: "agent".to_string(),
            file_name: name.to_string(),
            file_type: "txt".to_string(),
            file_size: content.len() as u64,
            content: content.to_string(),
            created_at: Local::now(),
        }
    }

    #[test]
    fn test_spec_requires_query() {
        let spec = knowledge_tool_spec();
        assert_eq!(spec.name, "search_knowledge_base");
        assert_eq!(spec.input_schema["required"], json!(["query"]));
        assert_eq!(spec.input_schema["properties"]["query"]["type"], "string");
    }

    #[test]
    fn test_search_concatenates_documents() {
        let kb = KnowledgeBase::new(vec![doc("a.txt", "hello"), doc("b.md", "# world")]);
        assert_eq!(kb.search("anything"), "--- a.txt ---\nhello\n\n--- b.md ---\n# world");
    }

    #[test]
    fn test_search_empty() {
        assert_eq!(
            KnowledgeBase::default().search("q"),
            "No documents found in knowledge base."
        );
    }

    #[test]
    fn test_found_message_plural() {
        assert_eq!(
            KnowledgeBase::new(vec![doc("a.txt", "x")]).found_message(),
            "Found 1 document in knowledge base"
        );
        assert_eq!(
            KnowledgeBase::new(vec![doc("a.txt", "x"), doc("b.txt", "y")]).found_message(),
            "Found 2 documents in knowledge base"
        );
    }
}
