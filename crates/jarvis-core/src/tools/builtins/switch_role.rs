use async_trait::async_trait;
use serde_json::{Value, json};

use crate::message::Role;
use crate::tools::traits::{Risk, Tool, ToolResult};

/// The literal sentinel prefix the `state_updater` graph node scans for in
/// `tools`-node output (bounded look-back of 3 messages). See
/// [`crate::graph::nodes::ROLE_SWITCH_PREFIX`].
pub const ROLE_SWITCH_PREFIX: &str = "__JARVIS_SWITCH_ROLE__:";

/// Changes the active LLM role by emitting the role-switch sentinel as the
/// first line of its result. The engine's `state_updater` is authoritative
/// on this sentinel; any driver-side parsing is best-effort display only.
pub struct SwitchRoleTool;

#[async_trait]
impl Tool for SwitchRoleTool {
    fn name(&self) -> &str {
        "switch_role"
    }

    fn description(&self) -> &str {
        "Switch the active LLM role for subsequent turns in this conversation."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": {
                    "type": "string",
                    "description": "One of: default, smart, coder, fast, vision."
                }
            },
            "required": ["role"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Safe
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let role_str = args.get("role").and_then(Value::as_str).ok_or("missing required argument 'role'")?;

        match role_str.parse::<Role>() {
            Ok(role) => Ok(ToolResult::ok(format!("{ROLE_SWITCH_PREFIX}{role}"))),
            Err(_) => Ok(ToolResult::err(format!("unknown role '{role_str}'; role was not changed"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn switching_to_known_role_emits_sentinel_first_line() {
        let tool = SwitchRoleTool;
        let result = tool.execute(json!({"role": "vision"})).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output.lines().next().unwrap(), "__JARVIS_SWITCH_ROLE__:vision");
    }

    #[tokio::test]
    async fn switching_to_unknown_role_fails_without_sentinel() {
        let tool = SwitchRoleTool;
        let result = tool.execute(json!({"role": "bogus"})).await.unwrap();
        assert!(!result.success);
        assert!(!result.output.starts_with(ROLE_SWITCH_PREFIX));
    }

    #[tokio::test]
    async fn missing_role_arg_errors() {
        let tool = SwitchRoleTool;
        assert!(tool.execute(json!({})).await.is_err());
    }
}
