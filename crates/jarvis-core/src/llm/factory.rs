use std::sync::Arc;

use serde_json::Value;

use crate::config::{CoreConfig, RoleConfig};
use crate::error::EngineError;
use crate::message::{Message, Role};

use super::openai_compatible::OpenAiCompatibleProvider;
use super::provider::{CompletionRequest, CompletionResponse, LLMProvider, TokenStream};

const DEFAULT_TEMPERATURE: f32 = 0.7;

/// A role bound to a concrete provider/model, with tool schemas attached
/// by the caller at invocation time.
pub struct BoundChat {
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
}

impl BoundChat {
    pub async fn invoke(&self, messages: Vec<Message>, tools: Vec<Value>) -> Result<CompletionResponse, String> {
        let mut request = CompletionRequest::new(self.model.clone(), messages, tools);
        request.temperature = self.temperature;
        self.provider.complete(request).await
    }

    pub async fn stream(&self, messages: Vec<Message>, tools: Vec<Value>) -> Result<TokenStream, String> {
        let mut request = CompletionRequest::new(self.model.clone(), messages, tools);
        request.temperature = self.temperature;
        self.provider.stream(request).await
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }
}

/// Role -> bound chat model dispatcher. Owns provider selection and the
/// fallback behaviour described in the role-routing contract: `coder`/
/// `fast` prefer a local-inference provider and fall back to `default` if
/// it's unreachable; any role lacking usable credentials also falls back
/// to `default`. If `default` itself cannot be bound, construction fails
/// with [`EngineError::NoLlmAvailable`] — the only fatal error this
/// factory can raise.
pub struct LLMFactory {
    config: CoreConfig,
    http_client: reqwest::Client,
}

impl LLMFactory {
    pub fn new(config: CoreConfig, http_client: reqwest::Client) -> Self {
        Self { config, http_client }
    }

    pub async fn bind(&self, role: Role) -> Result<BoundChat, EngineError> {
        if let Some(bound) = self.try_bind(role).await {
            return Ok(bound);
        }
        if role != Role::Default {
            tracing::warn!(%role, "falling back to default role");
            if let Some(bound) = self.try_bind(Role::Default).await {
                return Ok(bound);
            }
        }
        Err(EngineError::NoLlmAvailable)
    }

    async fn try_bind(&self, role: Role) -> Option<BoundChat> {
        let cfg = self.config.role(role)?;
        if !cfg.is_usable() || !has_credentials(cfg) {
            return None;
        }

        let provider = self.make_provider(cfg);

        let prefers_local = matches!(role, Role::Coder | Role::Fast);
        if prefers_local && provider.warmup().await.is_err() {
            tracing::warn!(%role, "local-preferred provider unreachable");
            return None;
        }

        let model = cfg.model.clone()?;
        Some(BoundChat { provider: Arc::new(provider), model, temperature: DEFAULT_TEMPERATURE })
    }

    fn make_provider(&self, cfg: &RoleConfig) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            self.http_client.clone(),
            cfg.base_url.clone().unwrap_or_default(),
            cfg.api_key.clone(),
        )
    }
}

/// A role with no `api_key` is only usable when its endpoint is a local
/// inference server; every other provider needs an explicit credential.
fn has_credentials(cfg: &RoleConfig) -> bool {
    if cfg.api_key.is_some() {
        return true;
    }
    cfg.base_url.as_deref().is_some_and(|url| url.contains("localhost") || url.contains("127.0.0.1"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;

    fn usable_cfg(base_url: &str, api_key: Option<&str>) -> RoleConfig {
        RoleConfig {
            provider: Some("openai-compatible".into()),
            model: Some("test-model".into()),
            base_url: Some(base_url.to_string()),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(60),
        }
    }

    fn config_with(roles: Vec<(Role, RoleConfig)>) -> CoreConfig {
        let mut map = HashMap::new();
        for (role, cfg) in roles {
            map.insert(role, cfg);
        }
        CoreConfig {
            roles: map,
            max_history_messages: 30,
            checkpoint_path: std::path::PathBuf::from(":memory:"),
            workspace_root: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn default_role_with_remote_endpoint_needs_api_key() {
        let config = config_with(vec![(Role::Default, usable_cfg("https://api.example.com/v1", None))]);
        let factory = LLMFactory::new(config, reqwest::Client::new());
        let result = factory.bind(Role::Default).await;
        assert!(matches!(result, Err(EngineError::NoLlmAvailable)));
    }

    #[tokio::test]
    async fn unconfigured_role_falls_back_to_default() {
        let config = config_with(vec![(Role::Default, usable_cfg("http://localhost:11434/v1", None))]);
        let factory = LLMFactory::new(config, reqwest::Client::new());
        let bound = factory.bind(Role::Smart).await.unwrap();
        assert_eq!(bound.provider_name(), "openai-compatible");
    }

    #[test]
    fn has_credentials_true_for_local_without_api_key() {
        let cfg = usable_cfg("http://localhost:8080/v1", None);
        assert!(has_credentials(&cfg));
    }

    #[test]
    fn has_credentials_false_for_remote_without_api_key() {
        let cfg = usable_cfg("https://api.example.com/v1", None);
        assert!(!has_credentials(&cfg));
    }
}
