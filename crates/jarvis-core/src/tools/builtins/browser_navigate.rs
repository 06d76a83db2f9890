use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

/// Fetches a URL and reports its status. Dangerous: remote side effects
/// (the target server observes the request).
///
/// This repository does not wire in a real headless-browser backend; this
/// is a seam over a plain HTTP GET so the dangerous-tool approval path is
/// exercised end to end without a browser automation dependency.
pub struct BrowserNavigateTool {
    client: reqwest::Client,
}

impl BrowserNavigateTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for BrowserNavigateTool {
    fn name(&self) -> &str {
        "browser_navigate"
    }

    fn description(&self) -> &str {
        "Navigate to a URL and report the page's response status."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string"}
            },
            "required": ["url"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Dangerous
    }

    fn timeout_secs(&self) -> u64 {
        30
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let url = args.get("url").and_then(Value::as_str).ok_or("missing required argument 'url'")?;
        let response = self.client.get(url).send().await.map_err(|e| format!("request failed: {e}"))?;
        let status = response.status();
        if status.is_success() {
            Ok(ToolResult::ok(format!("navigated to {url}: {status}")))
        } else {
            Ok(ToolResult::err(format!("navigation to {url} returned {status}")))
        }
    }
}
