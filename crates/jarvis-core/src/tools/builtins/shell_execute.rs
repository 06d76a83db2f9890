use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

/// Runs a command via `sh -c`. Dangerous: arbitrary subprocess execution.
pub struct ShellExecuteTool;

#[async_trait]
impl Tool for ShellExecuteTool {
    fn name(&self) -> &str {
        "shell_execute"
    }

    fn description(&self) -> &str {
        "Execute a shell command and return its stdout/stderr output."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "working_dir": {"type": "string"}
            },
            "required": ["command"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Dangerous
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let command = args.get("command").and_then(Value::as_str).ok_or("missing required argument 'command'")?.to_string();
        let working_dir = args.get("working_dir").and_then(Value::as_str).map(str::to_string);

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(&command);
        if let Some(dir) = &working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|e| format!("failed to spawn process: {e}"))?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let success = output.status.success();

        let combined = if stderr.is_empty() {
            stdout
        } else if stdout.is_empty() {
            format!("STDERR: {stderr}")
        } else {
            format!("{stdout}\nSTDERR: {stderr}")
        };

        if success {
            Ok(ToolResult::ok(combined))
        } else {
            Ok(ToolResult::err(combined))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_succeeds() {
        let tool = ShellExecuteTool;
        let result = tool.execute(json!({"command": "echo hello"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_reports_failure() {
        let tool = ShellExecuteTool;
        let result = tool.execute(json!({"command": "exit 1"})).await.unwrap();
        assert!(!result.success);
    }

    #[tokio::test]
    async fn missing_command_arg_errors() {
        let tool = ShellExecuteTool;
        assert!(tool.execute(json!({})).await.is_err());
    }
}
