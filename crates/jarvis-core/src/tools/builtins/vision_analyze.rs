use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

/// Screen capture + vision LLM analysis. Safe: read-only observation.
///
/// This repository does not wire in a real screen-capture backend or
/// vision model; this is a seam that returns a deterministic placeholder
/// description so the surrounding orchestration (role switch to `vision`,
/// tool dispatch, risk gating) is fully exercised end to end.
pub struct VisionAnalyzeTool;

#[async_trait]
impl Tool for VisionAnalyzeTool {
    fn name(&self) -> &str {
        "vision_analyze"
    }

    fn description(&self) -> &str {
        "Capture the current screen and describe it according to the given prompt."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "prompt": {"type": "string", "description": "What to look for in the capture."}
            },
            "required": ["prompt"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Safe
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let prompt = args.get("prompt").and_then(Value::as_str).ok_or("missing required argument 'prompt'")?;
        Ok(ToolResult::ok(format!("[vision seam not wired in this build] would analyze screen for: {prompt}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_in_placeholder_description() {
        let tool = VisionAnalyzeTool;
        let result = tool.execute(json!({"prompt": "is there a red cup?"})).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains("red cup"));
    }
}
