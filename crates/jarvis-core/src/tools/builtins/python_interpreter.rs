use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

/// Runs inline Python via `python3 -c`. Dangerous: arbitrary subprocess
/// execution, with its own per-call timeout separate from the engine's
/// default tool deadline.
pub struct PythonInterpreterTool;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[async_trait]
impl Tool for PythonInterpreterTool {
    fn name(&self) -> &str {
        "python_interpreter"
    }

    fn description(&self) -> &str {
        "Execute a Python snippet via python3 and return its stdout/stderr output."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {"type": "string"},
                "timeout_secs": {"type": "integer", "minimum": 1, "maximum": 600}
            },
            "required": ["code"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Dangerous
    }

    fn timeout_secs(&self) -> u64 {
        60
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let code = args.get("code").and_then(Value::as_str).ok_or("missing required argument 'code'")?;
        let timeout_secs = args.get("timeout_secs").and_then(Value::as_u64).unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut cmd = tokio::process::Command::new("python3");
        cmd.arg("-c").arg(code);

        let run = cmd.output();
        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(format!("failed to spawn python3: {e}")),
            Err(_) => return Ok(ToolResult::err(format!("python_interpreter timed out after {timeout_secs}s"))),
        };

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
    async fn prints_to_stdout() {
        let tool = PythonInterpreterTool;
        let result = tool.execute(json!({"code": "print('hi')"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("hi"));
    }

    #[tokio::test]
    async fn missing_code_arg_errors() {
        let tool = PythonInterpreterTool;
        assert!(tool.execute(json!({})).await.is_err());
    }
}
