//! Environment-driven configuration.
//!
//! No TOML file is read here — every setting comes directly from the
//! process environment, mirroring the original assistant's configuration
//! module. Absent role configuration means "fall back to default" per the
//! [`crate::llm::factory::LLMFactory`] contract.

use std::time::Duration;

use directories::ProjectDirs;

use crate::message::Role;

/// Provider + model + endpoint binding for one [`Role`].
#[derive(Debug, Clone)]
pub struct RoleConfig {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl RoleConfig {
    /// Whether enough information is present to actually bind a chat model
    /// for this role.
    pub fn is_usable(&self) -> bool {
        self.model.is_some() && self.base_url.is_some()
    }

    fn from_env(prefix: &str) -> Self {
        let get = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();
        let timeout_secs: u64 = get("TIMEOUT_SECS").and_then(|s| s.parse().ok()).unwrap_or(60);
        Self {
            provider: get("PROVIDER"),
            model: get("MODEL"),
            base_url: get("BASE_URL"),
            api_key: get("API_KEY"),
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Top-level configuration the core reads at startup.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub roles: std::collections::HashMap<Role, RoleConfig>,
    pub max_history_messages: usize,
    pub checkpoint_path: std::path::PathBuf,
    pub workspace_root: std::path::PathBuf,
}

const DEFAULT_MAX_HISTORY: usize = 30;

impl CoreConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Self {
        let mut roles = std::collections::HashMap::new();
        for role in Role::ALL {
            let prefix = role.as_str().to_uppercase();
            roles.insert(role, RoleConfig::from_env(&prefix));
        }

        let max_history_messages = std::env::var("MAX_HISTORY_MESSAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_HISTORY);

        let checkpoint_path = std::env::var("JARVIS_CHECKPOINT_PATH")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| default_checkpoint_path());

        let workspace_root = std::env::var("JARVIS_WORKSPACE_ROOT")
            .map(std::path::PathBuf::from)
            .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from(".")));

        Self { roles, max_history_messages, checkpoint_path, workspace_root }
    }

    pub fn role(&self, role: Role) -> Option<&RoleConfig> {
        self.roles.get(&role)
    }
}

fn default_checkpoint_path() -> std::path::PathBuf {
    ProjectDirs::from("com", "sprklai", "jarvis-core")
        .map(|dirs| dirs.data_dir().join("checkpoints.sqlite3"))
        .unwrap_or_else(|| std::path::PathBuf::from("jarvis-checkpoints.sqlite3"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_config_unusable_without_model_and_base_url() {
        let cfg = RoleConfig { provider: None, model: None, base_url: None, api_key: None, timeout: Duration::from_secs(60) };
        assert!(!cfg.is_usable());
    }

    #[test]
    fn role_config_usable_with_model_and_base_url() {
        let cfg = RoleConfig {
            provider: Some("openai-compatible".into()),
            model: Some("gpt-4".into()),
            base_url: Some("http://localhost:11434/v1".into()),
            api_key: None,
            timeout: Duration::from_secs(60),
        };
        assert!(cfg.is_usable());
    }

    #[test]
    fn default_max_history_is_thirty() {
        assert_eq!(DEFAULT_MAX_HISTORY, 30);
    }
}
