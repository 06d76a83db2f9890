use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde_json::Value;

use crate::message::Message;

/// Request for one chat completion, already sanitised and with a fresh
/// system prompt prepended by the `chatbot` graph node.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub tools: Vec<Value>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, tools: Vec<Value>) -> Self {
        Self { model: model.into(), messages, tools, temperature: 0.7, max_tokens: None }
    }
}

/// Result of a chat completion: always an `Assistant` [`Message`] (possibly
/// with tool calls, possibly terminal).
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
}

pub type StreamItem = Result<String, String>;
pub type TokenStream = Pin<Box<dyn Stream<Item = StreamItem> + Send>>;

/// An opaque `(messages, tool_schemas) -> assistant_message` binding. One
/// concrete implementation ([`super::openai_compatible::OpenAiCompatibleProvider`])
/// ships in this repository.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, String>;

    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, String>;

    fn provider_name(&self) -> &str;

    /// Cheap reachability probe used by [`super::factory::LLMFactory`] to
    /// decide whether to fall back to the default role's provider.
    async fn warmup(&self) -> Result<(), String> {
        Ok(())
    }
}
