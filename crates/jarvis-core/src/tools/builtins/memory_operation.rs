use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::store::Store;
use crate::tools::traits::{Risk, Tool, ToolResult};

/// Reads/writes the local user-profile store. Safe: confined to an
/// in-process key/value namespace, no filesystem or network access.
pub struct MemoryOperationTool {
    store: Arc<Store>,
}

impl MemoryOperationTool {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for MemoryOperationTool {
    fn name(&self) -> &str {
        "memory_operation"
    }

    fn description(&self) -> &str {
        "Store, recall, or forget a note in the user's personal memory store."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["store", "recall", "forget"]},
                "key": {"type": "string", "description": "Key for store/forget."},
                "value": {"type": "string", "description": "Value for store."},
                "query": {"type": "string", "description": "Query for recall."}
            },
            "required": ["action"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Safe
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let action = args.get("action").and_then(Value::as_str).ok_or("missing required argument 'action'")?;

        match action {
            "store" => {
                let key = args.get("key").and_then(Value::as_str).ok_or("'store' requires 'key'")?;
                let value = args.get("value").and_then(Value::as_str).ok_or("'store' requires 'value'")?;
                self.store.store(key, value);
                Ok(ToolResult::ok(format!("stored '{key}'")))
            }
            "forget" => {
                let key = args.get("key").and_then(Value::as_str).ok_or("'forget' requires 'key'")?;
                if self.store.forget(key) {
                    Ok(ToolResult::ok(format!("forgot '{key}'")))
                } else {
                    Ok(ToolResult::err(format!("no entry for '{key}'")))
                }
            }
            "recall" => {
                let query = args.get("query").and_then(Value::as_str).unwrap_or("");
                let hits = self.store.recall(query, 10);
                if hits.is_empty() {
                    Ok(ToolResult::ok("no matching memories".to_string()))
                } else {
                    let text = hits.iter().map(|e| format!("{}: {}", e.key, e.content)).collect::<Vec<_>>().join("\n");
                    Ok(ToolResult::ok(text))
                }
            }
            other => Ok(ToolResult::err(format!("unknown action '{other}'"))),
        }
    }
}
