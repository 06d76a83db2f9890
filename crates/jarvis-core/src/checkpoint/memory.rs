use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::EngineError;
use crate::message::{InteractionMode, merge};
use crate::state::AgentState;

use super::traits::{Checkpoint, Checkpointer, StateDelta};

/// Mutex-guarded in-memory [`Checkpointer`], used for tests and for
/// threads that don't need durability across a process restart.
#[derive(Default)]
pub struct InMemoryCheckpointer {
    threads: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self { threads: Mutex::new(HashMap::new()) }
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>, EngineError> {
        Ok(self.threads.lock().get(thread_id).cloned())
    }

    async fn put(&self, thread_id: &str, checkpoint: Checkpoint) -> Result<(), EngineError> {
        let mut threads = self.threads.lock();
        let next_version = threads.get(thread_id).map(|cp| cp.version + 1).unwrap_or(1);
        if checkpoint.version < next_version {
            return Err(EngineError::CheckpointerWrite(format!(
                "stale write: thread {thread_id} expected version >= {next_version}, got {}",
                checkpoint.version
            )));
        }
        threads.insert(thread_id.to_string(), checkpoint);
        Ok(())
    }

    async fn update_partial(
        &self,
        thread_id: &str,
        delta: StateDelta,
        next: Vec<String>,
        produced_by: &str,
    ) -> Result<Checkpoint, EngineError> {
        let mut threads = self.threads.lock();
        let (mut state, prior_version) = match threads.get(thread_id) {
            Some(cp) => (cp.state.clone(), cp.version),
            None => (AgentState::new(InteractionMode::Text), 0),
        };

        state.messages = merge(&state.messages, &delta.messages)
            .map_err(|e| EngineError::CheckpointerWrite(format!("{produced_by}: {e}")))?;
        if let Some(role) = delta.current_role {
            state.current_role = role;
        }

        let checkpoint = Checkpoint { state, next, version: prior_version + 1 };
        threads.insert(thread_id.to_string(), checkpoint.clone());
        Ok(checkpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[tokio::test]
    async fn get_latest_none_for_unknown_thread() {
        let cp = InMemoryCheckpointer::new();
        assert!(cp.get_latest("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_partial_creates_and_accumulates_state() {
        let cp = InMemoryCheckpointer::new();
        let delta = StateDelta { messages: vec![Message::user("hi")], current_role: None };
        let checkpoint = cp.update_partial("t1", delta, vec!["chatbot".into()], "driver").await.unwrap();
        assert_eq!(checkpoint.version, 1);
        assert_eq!(checkpoint.state.messages.len(), 1);

        let delta2 = StateDelta { messages: vec![Message::assistant("hello", vec![])], current_role: None };
        let checkpoint2 = cp.update_partial("t1", delta2, vec![], "chatbot").await.unwrap();
        assert_eq!(checkpoint2.version, 2);
        assert_eq!(checkpoint2.state.messages.len(), 2);
    }

    #[tokio::test]
    async fn put_rejects_stale_version() {
        let cp = InMemoryCheckpointer::new();
        let delta = StateDelta::default();
        let checkpoint = cp.update_partial("t1", delta, vec![], "driver").await.unwrap();
        let result = cp.put("t1", checkpoint).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn durability_read_after_write_returns_version_at_least_written() {
        let cp = InMemoryCheckpointer::new();
        let written = cp.update_partial("t1", StateDelta::default(), vec![], "driver").await.unwrap();
        let read = cp.get_latest("t1").await.unwrap().unwrap();
        assert!(read.version >= written.version);
    }
}
