//! The conversation message model and its reducer/sanitiser.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub type MessageId = String;

fn new_id() -> MessageId {
    Uuid::new_v4().to_string()
}

/// A tool call emitted by the assistant. `args` is a free-form JSON object
/// matching the descriptor's `parameters` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// One entry in the conversation log. Tagged by `role` so the wire format
/// stays a flat, self-describing JSON object per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        id: MessageId,
        content: String,
    },
    User {
        id: MessageId,
        content: String,
    },
    Assistant {
        id: MessageId,
        content: String,
        #[serde(default)]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        id: MessageId,
        tool_call_id: String,
        name: String,
        content: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System { id: new_id(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User { id: new_id(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant { id: new_id(), content: content.into(), tool_calls }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool { id: new_id(), tool_call_id: tool_call_id.into(), name: name.into(), content: content.into() }
    }

    pub fn id(&self) -> &str {
        match self {
            Message::System { id, .. }
            | Message::User { id, .. }
            | Message::Assistant { id, .. }
            | Message::Tool { id, .. } => id,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// An assistant message with no tool calls ends the current turn.
    pub fn is_terminal_assistant(&self) -> bool {
        matches!(self, Message::Assistant { tool_calls, .. } if tool_calls.is_empty())
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Message::Tool { .. })
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }
}

/// Active LLM role. Part of [`crate::state::AgentState`]; mutable only
/// through the `switch_role` sentinel (see [`crate::llm::factory`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Default,
    Smart,
    Coder,
    Fast,
    Vision,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Default, Role::Smart, Role::Coder, Role::Fast, Role::Vision];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Default => "default",
            Role::Smart => "smart",
            Role::Coder => "coder",
            Role::Fast => "fast",
            Role::Vision => "vision",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" => Ok(Role::Default),
            "smart" => Ok(Role::Smart),
            "coder" => Ok(Role::Coder),
            "fast" => Ok(Role::Fast),
            "vision" => Ok(Role::Vision),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Voice,
    Text,
}

/// Errors raised by [`merge`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReducerError {
    #[error("incoming message list contains duplicate id: {0}")]
    DuplicateIncomingId(String),
}

/// Append `incoming` onto `existing` with id-keyed replacement: a message
/// whose id already exists in `existing` overwrites in place; everything
/// else is appended in order.
pub fn merge(existing: &[Message], incoming: &[Message]) -> Result<Vec<Message>, ReducerError> {
    let mut seen = HashSet::new();
    for m in incoming {
        if !seen.insert(m.id().to_string()) {
            return Err(ReducerError::DuplicateIncomingId(m.id().to_string()));
        }
    }

    let mut result = existing.to_vec();
    let mut index_of: HashMap<String, usize> =
        result.iter().enumerate().map(|(i, m)| (m.id().to_string(), i)).collect();

    for m in incoming {
        if let Some(&idx) = index_of.get(m.id()) {
            result[idx] = m.clone();
        } else {
            index_of.insert(m.id().to_string(), result.len());
            result.push(m.clone());
        }
    }

    Ok(result)
}

/// Which sanitisation rules a provider needs applied before a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFlavour {
    /// Requires every assistant tool-call to be immediately followed by
    /// exactly its matching tool responses.
    Strict,
    /// No pairing requirements; sanitisation is the identity.
    Lenient,
}

/// Produce a new log suitable for handing to `flavour`'s chat completion
/// endpoint. Never mutates `log`; total and deterministic.
pub fn sanitise_for_provider(log: &[Message], flavour: ProviderFlavour) -> Vec<Message> {
    if flavour == ProviderFlavour::Lenient {
        return log.to_vec();
    }

    let mut out: Vec<Message> = Vec::with_capacity(log.len());
    let mut i = 0;
    while i < log.len() {
        let msg = &log[i];
        if let Message::Assistant { id, content, tool_calls } = msg {
            if !tool_calls.is_empty() {
                let ids: HashSet<&str> = tool_calls.iter().map(|c| c.id.as_str()).collect();
                let mut j = i + 1;
                let mut matched: HashSet<&str> = HashSet::new();
                let mut extra = false;
                while j < log.len() {
                    if let Message::Tool { tool_call_id, .. } = &log[j] {
                        if ids.contains(tool_call_id.as_str()) {
                            matched.insert(tool_call_id.as_str());
                        } else {
                            extra = true;
                        }
                        j += 1;
                    } else {
                        break;
                    }
                }

                if matched.len() == ids.len() && !extra {
                    out.push(msg.clone());
                    out.extend_from_slice(&log[i + 1..j]);
                } else {
                    out.push(Message::Assistant { id: id.clone(), content: content.clone(), tool_calls: vec![] });
                }
                i = j;
                continue;
            }
        }
        out.push(msg.clone());
        i += 1;
    }

    while matches!(out.last(), Some(m) if m.is_tool()) {
        out.pop();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_appends_new_messages() {
        let a = Message::user("hi");
        let existing = vec![a.clone()];
        let b = Message::assistant("hello", vec![]);
        let merged = merge(&existing, &[b.clone()]).unwrap();
        assert_eq!(merged, vec![a, b]);
    }

    #[test]
    fn merge_replaces_by_id_in_place() {
        let a = Message::user("draft");
        let b = Message::assistant("reply", vec![]);
        let existing = vec![a.clone(), b.clone()];

        let replacement = match &a {
            Message::User { id, .. } => Message::User { id: id.clone(), content: "final".into() },
            _ => unreachable!(),
        };

        let merged = merge(&existing, &[replacement.clone()]).unwrap();
        assert_eq!(merged, vec![replacement, b]);
    }

    #[test]
    fn merge_rejects_duplicate_incoming_ids() {
        let a = Message::user("x");
        let err = merge(&[], &[a.clone(), a]).unwrap_err();
        assert!(matches!(err, ReducerError::DuplicateIncomingId(_)));
    }

    fn call(id: &str) -> ToolCall {
        ToolCall { id: id.into(), name: "t".into(), args: serde_json::json!({}) }
    }

    #[test]
    fn sanitise_keeps_fully_paired_calls() {
        let log = vec![
            Message::user("go"),
            Message::assistant("", vec![call("c1"), call("c2")]),
            Message::tool_result("c1", "t", "r1"),
            Message::tool_result("c2", "t", "r2"),
            Message::assistant("done", vec![]),
        ];
        let sanitised = sanitise_for_provider(&log, ProviderFlavour::Strict);
        assert_eq!(sanitised, log);
    }

    #[test]
    fn sanitise_strips_partially_paired_calls() {
        let log = vec![
            Message::user("go"),
            Message::assistant("", vec![call("c1"), call("c2")]),
            Message::tool_result("c1", "t", "r1"),
            Message::assistant("done", vec![]),
        ];
        let sanitised = sanitise_for_provider(&log, ProviderFlavour::Strict);
        assert_eq!(sanitised.len(), 3);
        assert!(sanitised[1].tool_calls().is_empty());
        assert!(!sanitised.iter().any(|m| m.is_tool()));
    }

    #[test]
    fn sanitise_drops_trailing_tool_message() {
        let log = vec![
            Message::user("go"),
            Message::assistant("", vec![call("c1")]),
            Message::tool_result("c1", "t", "r1"),
        ];
        let sanitised = sanitise_for_provider(&log, ProviderFlavour::Strict);
        assert!(!matches!(sanitised.last(), Some(m) if m.is_tool()));
    }

    #[test]
    fn sanitise_lenient_is_identity() {
        let log = vec![Message::user("go"), Message::assistant("", vec![call("c1")])];
        let sanitised = sanitise_for_provider(&log, ProviderFlavour::Lenient);
        assert_eq!(sanitised, log);
    }
}
