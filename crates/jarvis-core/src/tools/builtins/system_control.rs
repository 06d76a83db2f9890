use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

const ALLOWED_ACTIONS: &[&str] = &["volume", "brightness", "launch_app"];

/// Volume/brightness/app-launch control. Safe: value-bounded, no shell
/// execution; this build simulates the effect rather than touching real
/// OS controls.
pub struct SystemControlTool;

#[async_trait]
impl Tool for SystemControlTool {
    fn name(&self) -> &str {
        "system_control"
    }

    fn description(&self) -> &str {
        "Adjust a simple system setting (volume, brightness) or launch an application."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ALLOWED_ACTIONS},
                "value": {"type": "string", "description": "Target value, e.g. '50' or an app name."}
            },
            "required": ["action"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Safe
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let action = args.get("action").and_then(Value::as_str).ok_or("missing required argument 'action'")?;
        if !ALLOWED_ACTIONS.contains(&action) {
            return Ok(ToolResult::err(format!("unsupported action '{action}'")));
        }
        let value = args.get("value").and_then(Value::as_str).unwrap_or("");
        Ok(ToolResult::ok(format!("simulated {action} -> {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allowed_action_succeeds() {
        let tool = SystemControlTool;
        let result = tool.execute(json!({"action": "volume", "value": "30"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("volume"));
    }

    #[tokio::test]
    async fn disallowed_action_fails() {
        let tool = SystemControlTool;
        let result = tool.execute(json!({"action": "shutdown"})).await.unwrap();
        assert!(!result.success);
    }
}
