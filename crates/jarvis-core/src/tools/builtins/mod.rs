pub mod browser_navigate;
pub mod file_operation;
pub mod knowledge_ingest;
pub mod knowledge_query;
pub mod memory_operation;
pub mod python_interpreter;
pub mod shell_execute;
pub mod switch_role;
pub mod system_control;
pub mod vision_analyze;

pub use browser_navigate::BrowserNavigateTool;
pub use file_operation::FileOperationTool;
pub use knowledge_ingest::KnowledgeIngestTool;
pub use knowledge_query::KnowledgeQueryTool;
pub use memory_operation::MemoryOperationTool;
pub use python_interpreter::PythonInterpreterTool;
pub use shell_execute::ShellExecuteTool;
pub use switch_role::{ROLE_SWITCH_PREFIX, SwitchRoleTool};
pub use system_control::SystemControlTool;
pub use vision_analyze::VisionAnalyzeTool;

use std::sync::Arc;

use crate::tools::registry::ToolRegistry;
use crate::tools::store::Store;

/// Register every built-in tool into `registry`, sharing one knowledge
/// store between `memory_operation`, `knowledge_query`, and
/// `knowledge_ingest`.
pub fn register_builtin_tools(registry: &mut ToolRegistry, workspace_root: std::path::PathBuf, http_client: reqwest::Client) {
    let store = Arc::new(Store::new());

    registry.register(Arc::new(SwitchRoleTool));
    registry.register(Arc::new(MemoryOperationTool::new(store.clone())));
    registry.register(Arc::new(KnowledgeQueryTool::new(store.clone())));
    registry.register(Arc::new(VisionAnalyzeTool));
    registry.register(Arc::new(SystemControlTool));

    registry.register(Arc::new(FileOperationTool::new(workspace_root)));
    registry.register(Arc::new(ShellExecuteTool));
    registry.register(Arc::new(PythonInterpreterTool));
    registry.register(Arc::new(BrowserNavigateTool::new(http_client)));
    registry.register(Arc::new(KnowledgeIngestTool::new(store)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::traits::Risk;

    #[test]
    fn registers_all_ten_builtin_tools_with_fixed_risk_table() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry, std::env::temp_dir(), reqwest::Client::new());
        assert_eq!(registry.len(), 10);

        let safe = ["switch_role", "memory_operation", "knowledge_query", "vision_analyze", "system_control"];
        let dangerous = ["file_operation", "shell_execute", "python_interpreter", "browser_navigate", "knowledge_ingest"];

        for name in safe {
            assert_eq!(registry.risk_of(name), Some(Risk::Safe), "{name} should be safe");
        }
        for name in dangerous {
            assert_eq!(registry.risk_of(name), Some(Risk::Dangerous), "{name} should be dangerous");
        }
    }
}
