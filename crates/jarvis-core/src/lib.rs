//! Core orchestrator: a graph-based agent loop over a typed conversation
//! state, with durable checkpointing and a human-in-the-loop safety gate
//! in front of dangerous tool calls.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod events;
pub mod graph;
pub mod llm;
pub mod message;
pub mod safety;
pub mod state;
pub mod tools;

pub use error::{EngineError, EngineResult};
pub use message::{InteractionMode, Message, Role, ToolCall};
pub use state::AgentState;
