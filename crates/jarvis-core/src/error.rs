//! Typed error surface for the orchestrator core.

use thiserror::Error;

/// Errors the core can raise across the engine/driver boundary.
///
/// Every variant here corresponds to one of the eight error kinds the
/// orchestrator is allowed to surface. Everything except
/// [`EngineError::NoLlmAvailable`] and [`EngineError::CheckpointerWrite`]
/// is expected to be *recovered* internally (turned into a message in the
/// log) rather than propagated; those two are the only fatal kinds.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no LLM binding is available for any role")]
    NoLlmAvailable,

    #[error("LLM invocation failed: {0}")]
    LlmInvocation(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments for tool {tool}: {reason}")]
    ToolArgumentInvalid { tool: String, reason: String },

    #[error("tool {tool} failed: {reason}")]
    ToolInvocation { tool: String, reason: String },

    #[error("tool {tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("checkpoint write failed: {0}")]
    CheckpointerWrite(String),

    #[error("turn cancelled")]
    Cancelled,
}

pub type EngineResult<T> = Result<T, EngineError>;
