use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::tools::store::Store;
use crate::tools::traits::{Risk, Tool, ToolResult};

/// Mutates the vector/knowledge store read by `knowledge_query`.
/// Dangerous: persistent write.
pub struct KnowledgeIngestTool {
    store: Arc<Store>,
}

impl KnowledgeIngestTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for KnowledgeIngestTool {
    fn name(&self) -> &str {
        "knowledge_ingest"
    }

    fn description(&self) -> &str {
        "Ingest a passage of text into the knowledge store for later retrieval."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "source": {"type": "string", "description": "Optional provenance label."}
            },
            "required": ["text"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Dangerous
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let text = args.get("text").and_then(Value::as_str).ok_or("missing required argument 'text'")?;
        let source = args.get("source").and_then(Value::as_str).unwrap_or("unlabelled");
        let key = format!("doc:{source}:{}", Uuid::new_v4());
        self.store.store(&key, text);
        Ok(ToolResult::ok(format!("ingested passage as {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ingested_passage_is_queryable() {
        let store = Arc::new(Store::new());
        let ingest = KnowledgeIngestTool::new(store.clone());
        ingest.execute(json!({"text": "Rust has no garbage collector.", "source": "notes"})).await.unwrap();
        assert_eq!(store.len(), 1);
        let hits = store.recall("garbage collector", 5);
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn missing_text_arg_errors() {
        let tool = KnowledgeIngestTool::new(Arc::new(Store::new()));
        assert!(tool.execute(json!({})).await.is_err());
    }
}
