use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::tools::traits::{Risk, Tool, ToolResult};

/// Read/write/list/delete confined to a workspace root. Dangerous:
/// mutates the filesystem.
pub struct FileOperationTool {
    workspace_root: PathBuf,
}

impl FileOperationTool {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self { workspace_root }
    }

    /// Resolve `relative` against the workspace root, rejecting null bytes,
    /// `..` traversal, and escapes outside the confinement root.
    fn resolve(&self, relative: &str) -> Result<PathBuf, String> {
        if relative.contains('\0') {
            return Err("path contains a null byte".to_string());
        }
        let candidate = Path::new(relative);
        if candidate.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return Err("path traversal ('..') is not permitted".to_string());
        }
        if candidate.is_absolute() {
            return Err("absolute paths are not permitted".to_string());
        }
        Ok(self.workspace_root.join(candidate))
    }
}

#[async_trait]
impl Tool for FileOperationTool {
    fn name(&self) -> &str {
        "file_operation"
    }

    fn description(&self) -> &str {
        "Read, write, list, or delete a file inside the confined workspace."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["read", "write", "list", "delete"]},
                "path": {"type": "string"},
                "content": {"type": "string", "description": "Content for 'write'."}
            },
            "required": ["action", "path"]
        })
    }

    fn risk(&self) -> Risk {
        Risk::Dangerous
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let action = args.get("action").and_then(Value::as_str).ok_or("missing required argument 'action'")?;
        let path_arg = args.get("path").and_then(Value::as_str).ok_or("missing required argument 'path'")?;
        let path = self.resolve(path_arg)?;

        match action {
            "read" => tokio::fs::read_to_string(&path).await.map(ToolResult::ok).map_err(|e| e.to_string()),
            "write" => {
                let content = args.get("content").and_then(Value::as_str).ok_or("'write' requires 'content'")?;
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| e.to_string())?;
                }
                tokio::fs::write(&path, content).await.map_err(|e| e.to_string())?;
                Ok(ToolResult::ok(format!("wrote {} bytes to {path_arg}", content.len())))
            }
            "list" => {
                let mut entries = Vec::new();
                let mut dir = tokio::fs::read_dir(&path).await.map_err(|e| e.to_string())?;
                while let Some(entry) = dir.next_entry().await.map_err(|e| e.to_string())? {
                    entries.push(entry.file_name().to_string_lossy().into_owned());
                }
                Ok(ToolResult::ok(entries.join("\n")))
            }
            "delete" => {
                tokio::fs::remove_file(&path).await.map_err(|e| e.to_string())?;
                Ok(ToolResult::ok(format!("deleted {path_arg}")))
            }
            other => Ok(ToolResult::err(format!("unknown action '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> FileOperationTool {
        FileOperationTool::new(std::env::temp_dir().join(format!("jarvis-file-op-test-{}", uuid::Uuid::new_v4())))
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let tool = tool();
        let write = tool.execute(json!({"action": "write", "path": "a.txt", "content": "hello"})).await.unwrap();
        assert!(write.success);
        let read = tool.execute(json!({"action": "read", "path": "a.txt"})).await.unwrap();
        assert_eq!(read.output, "hello");
    }

    #[tokio::test]
    async fn path_traversal_rejected() {
        let tool = tool();
        let result = tool.execute(json!({"action": "read", "path": "../etc/passwd"})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn absolute_path_rejected() {
        let tool = tool();
        let result = tool.execute(json!({"action": "read", "path": "/etc/passwd"})).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn list_nonexistent_dir_errors() {
        let tool = tool();
        let result = tool.execute(json!({"action": "list", "path": "."})).await;
        assert!(result.is_err());
    }
}
