use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::message::{Message, Role};
use crate::state::AgentState;

/// A durable snapshot of [`AgentState`] plus the node names the engine
/// will execute when resumed. `next` empty means the graph is terminal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub state: AgentState,
    pub next: Vec<String>,
    pub version: u64,
}

/// A partial state update applied on top of the latest checkpoint via
/// [`crate::message::merge`] plus an optional role change.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub messages: Vec<Message>,
    pub current_role: Option<Role>,
}

/// Durable key (`thread_id`) -> state store.
///
/// Implementations must be atomic per write, monotonic on read, and
/// portable (the on-disk format must survive a full process restart).
#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, EngineError>;

    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), EngineError>;

    /// Apply `delta` on top of the latest checkpoint (or a fresh state if
    /// none exists) as if it were produced by `produced_by`, persist the
    /// result with `next` recorded, and return the new checkpoint.
    async fn update_partial(
        &self,
        thread_id: &str,
        delta: StateDelta,
        next: Vec<String>,
        produced_by: &str,
    ) -> Result<Checkpoint, EngineError>;
}
