pub mod factory;
pub mod openai_compatible;
pub mod provider;

pub use factory::{BoundChat, LLMFactory};
pub use openai_compatible::OpenAiCompatibleProvider;
pub use provider::{CompletionRequest, CompletionResponse, LLMProvider};
