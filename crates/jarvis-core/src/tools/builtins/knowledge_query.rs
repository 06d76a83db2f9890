use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::store::Store;
use crate::tools::traits::{Risk, Tool, ToolResult};

/// Read-only search (RAG read) over the knowledge store populated by
/// `knowledge_ingest`. Safe: no mutation.
pub struct KnowledgeQueryTool {
    store: Arc<Store>,
}

impl KnowledgeQueryTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for KnowledgeQueryTool {
    fn name(&self) -> &str {
        "knowledge_query"
    }

    fn description(&self) -> &str {
        "Search previously ingested knowledge passages for text relevant to a query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "limit": {"type": "integer", "minimum": 1, "maximum": 50}
            },
            "required": ["query"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Safe
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let query = args.get("query").and_then(Value::as_str).ok_or("missing required argument 'query'")?;
        let limit = args.get("limit").and_then(Value::as_u64).unwrap_or(5) as usize;

        let hits = self.store.recall(query, limit);
        if hits.is_empty() {
            Ok(ToolResult::ok("no matching knowledge passages".to_string()))
        } else {
            let text = hits.iter().map(|e| e.content.clone()).collect::<Vec<_>>().join("\n---\n");
            Ok(ToolResult::ok(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_ingested_passage() {
        let store = Arc::new(Store::new());
        store.store("doc-1", "Rust is a systems programming language.");
        let tool = KnowledgeQueryTool::new(store);
        let result = tool.execute(json!({"query": "systems"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("Rust"));
    }

    #[tokio::test]
    async fn empty_store_returns_no_match_text() {
        let tool = KnowledgeQueryTool::new(Arc::new(Store::new()));
        let result = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("no matching"));
    }
}
