use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only risk classification the engine uses. Never inferred from a
/// tool's name — always carried explicitly on the descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Risk {
    Safe,
    Dangerous,
}

/// Outcome of one tool invocation, before it is wrapped into a `Tool`
/// conversation message.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub output: String,
    pub success: bool,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self { output: output.into(), success: true }
    }

    pub fn err(output: impl Into<String>) -> Self {
        Self { output: output.into(), success: false }
    }
}

/// A tool exposed to the LLM: `(typed_args) -> text_result`, opaque to the
/// engine beyond its name, schema, and risk class.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn risk(&self) -> Risk;

    /// Per-call deadline. Default 60s; individual tools may override up to
    /// the 600s ceiling.
    fn timeout_secs(&self) -> u64 {
        60
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String>;
}
