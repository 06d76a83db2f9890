use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::traits::{Risk, Tool, ToolResult};

/// Name -> tool-descriptor mapping. Populated once at engine construction
/// by registering a static list of tools; immutable thereafter.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: HashMap::new() }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// JSON-schema fragments the LLM needs to emit well-formed tool calls:
    /// `{name, description, parameters}` per tool, sub-definitions inlined,
    /// no top-level `title`.
    pub fn schema_bundle(&self) -> Vec<Value> {
        self.tools
            .values()
            .map(|tool| {
                let mut parameters = tool.parameters_schema();
                if let Some(obj) = parameters.as_object_mut() {
                    obj.remove("title");
                }
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": parameters,
                })
            })
            .collect()
    }

    /// Validate `args` against the tool's declared schema, then invoke it.
    /// Never raises: an unknown tool or a validation failure is returned
    /// as a failed [`ToolResult`] so the caller can always produce a
    /// synthetic tool-result message.
    pub async fn invoke(&self, name: &str, args: Value) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::err(format!("tool not found: {name}"));
        };

        if let Err(reason) = validate_args(&tool.parameters_schema(), &args) {
            return ToolResult::err(format!("invalid arguments for tool {name}: {reason}"));
        }

        match tool.execute(args).await {
            Ok(result) => result,
            Err(reason) => ToolResult::err(reason),
        }
    }

    pub fn risk_of(&self, name: &str) -> Option<Risk> {
        self.get(name).map(|t| t.risk())
    }
}

/// Table-driven validation against the `required` array of a JSON Schema
/// object. Does not attempt full JSON Schema validation — only presence
/// of required fields, which is what lets the LLM self-correct.
fn validate_args(schema: &Value, args: &Value) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Ok(());
    };
    let Some(obj) = args.as_object() else {
        return Err("arguments must be a JSON object".to_string());
    };
    for field in required {
        let Some(field_name) = field.as_str() else { continue };
        if !obj.contains_key(field_name) {
            return Err(format!("missing required argument '{field_name}'"));
        }
    }
    Ok(())
}
