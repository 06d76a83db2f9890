//! Structured per-thread agent state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::message::{InteractionMode, Message, Role};

/// The full state of one conversation thread.
///
/// `messages` is reduced via [`crate::message::merge`]; `current_role` is
/// mutated only by the `state_updater` graph node observing a role-switch
/// sentinel; `metadata` is a side channel never read by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentState {
    pub messages: Vec<Message>,
    pub current_role: Role,
    pub interaction_mode: InteractionMode,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentState {
    pub fn new(interaction_mode: InteractionMode) -> Self {
        Self {
            messages: Vec::new(),
            current_role: Role::Default,
            interaction_mode,
            metadata: HashMap::new(),
        }
    }

    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| matches!(m, Message::Assistant { .. }))
    }

    /// True once the most recent message is a terminal assistant turn.
    pub fn is_quiescent(&self) -> bool {
        matches!(self.messages.last(), Some(m) if m.is_terminal_assistant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_default_role_and_empty_log() {
        let state = AgentState::new(InteractionMode::Text);
        assert_eq!(state.current_role, Role::Default);
        assert!(state.messages.is_empty());
    }

    #[test]
    fn is_quiescent_true_only_for_terminal_assistant() {
        let mut state = AgentState::new(InteractionMode::Text);
        assert!(!state.is_quiescent());
        state.messages.push(Message::user("hi"));
        assert!(!state.is_quiescent());
        state.messages.push(Message::assistant("hello", vec![]));
        assert!(state.is_quiescent());
    }
}
