//! The three fixed graph nodes: `chatbot`, `tools`, `state_updater`.
//!
//! Each is a free function over borrowed [`AgentState`] rather than a
//! method on the engine, so [`super::engine::GraphEngine`] stays the only
//! thing that touches the `Checkpointer`.

use std::sync::Arc;
use std::time::Duration;

use crate::config::CoreConfig;
use crate::events::{AppEvent, EventBus};
use crate::llm::LLMFactory;
use crate::message::{InteractionMode, Message, ProviderFlavour, Role, sanitise_for_provider};
use crate::state::AgentState;
use crate::tools::{ROLE_SWITCH_PREFIX, ToolRegistry, ToolResult};

pub const CHATBOT: &str = "chatbot";
pub const TOOLS: &str = "tools";
pub const STATE_UPDATER: &str = "state_updater";

const ROLE_SWITCH_LOOKBACK: usize = 3;

/// Drop everything but the last `max` messages. Never severs a leading
/// tool-response orphan — a truncation window may not start mid-pair.
pub fn truncate_history(log: &[Message], max: usize) -> Vec<Message> {
    if log.len() <= max {
        return log.to_vec();
    }
    let start = log.len() - max;
    let mut truncated = log[start..].to_vec();
    while matches!(truncated.first(), Some(m) if m.is_tool()) {
        truncated.remove(0);
    }
    truncated
}

fn build_system_prompt(role: Role, mode: InteractionMode, registry: &ToolRegistry) -> String {
    let mode_label = match mode {
        InteractionMode::Voice => "voice",
        InteractionMode::Text => "text",
    };
    let catalogue = registry
        .list()
        .iter()
        .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are Jarvis, a personal AI assistant currently in {mode_label} mode with the '{role}' role active.\n\
Call a tool only when it is actually needed to answer; never invent a tool result.\n\n\
Available tools:\n{catalogue}"
    )
}

/// What the `chatbot` node produced and which node the engine runs next.
pub struct ChatbotOutcome {
    pub message: Message,
    pub next: Vec<String>,
}

#[tracing::instrument(skip_all, fields(thread_id = %thread_id, role = %state.current_role))]
pub async fn run_chatbot_node(
    state: &AgentState,
    config: &CoreConfig,
    llm_factory: &LLMFactory,
    tool_registry: &ToolRegistry,
    event_bus: &Arc<dyn EventBus>,
    thread_id: &str,
) -> ChatbotOutcome {
    let filtered: Vec<Message> = state.messages.iter().filter(|m| !m.is_system()).cloned().collect();
    let truncated = truncate_history(&filtered, config.max_history_messages);
    let sanitised = sanitise_for_provider(&truncated, ProviderFlavour::Strict);

    let system_prompt = build_system_prompt(state.current_role, state.interaction_mode, tool_registry);
    let mut outbound = Vec::with_capacity(sanitised.len() + 1);
    outbound.push(Message::system(system_prompt));
    outbound.extend(sanitised);

    let bound = match llm_factory.bind(state.current_role).await {
        Ok(bound) => bound,
        Err(err) => {
            tracing::warn!(%err, "no bound chat model available");
            return ChatbotOutcome {
                message: Message::assistant(format!("I ran into a problem reaching my language model: {err}"), vec![]),
                next: vec![],
            };
        }
    };

    let schemas = tool_registry.schema_bundle();
    let response = match bound.invoke(outbound, schemas).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(%err, "LLM invocation failed");
            return ChatbotOutcome {
                message: Message::assistant(format!("I ran into a problem answering that: {err}"), vec![]),
                next: vec![],
            };
        }
    };

    // Token streaming is best-effort: tool calls are only known once the
    // full response lands, so we replay the finished text in chunks rather
    // than interleave partial deltas with an incomplete tool-call parse.
    if let Message::Assistant { content, .. } = &response.message {
        for chunk in content.as_bytes().chunks(32) {
            let delta = String::from_utf8_lossy(chunk).into_owned();
            let _ = event_bus.publish(AppEvent::TokenDelta { thread_id: thread_id.to_string(), delta });
        }
    }

    let next = if response.message.tool_calls().is_empty() { vec![] } else { vec![TOOLS.to_string()] };
    ChatbotOutcome { message: response.message, next }
}

pub struct ToolsOutcome {
    pub messages: Vec<Message>,
}

#[tracing::instrument(skip_all, fields(thread_id = %thread_id))]
pub async fn run_tools_node(
    state: &AgentState,
    tool_registry: &ToolRegistry,
    event_bus: &Arc<dyn EventBus>,
    thread_id: &str,
) -> ToolsOutcome {
    let Some(Message::Assistant { tool_calls, .. }) = state.messages.last() else {
        return ToolsOutcome { messages: vec![] };
    };

    let mut messages = Vec::with_capacity(tool_calls.len());
    for call in tool_calls {
        let _ = event_bus.publish(AppEvent::ToolStarted {
            thread_id: thread_id.to_string(),
            tool_name: call.name.clone(),
            args: call.args.clone(),
        });

        let timeout_secs = tool_registry.get(&call.name).map(|t| t.timeout_secs()).unwrap_or(60);
        let result = match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tool_registry.invoke(&call.name, call.args.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => ToolResult::err(format!("tool {} timed out after {timeout_secs}s", call.name)),
        };

        let _ = event_bus.publish(AppEvent::ToolFinished {
            thread_id: thread_id.to_string(),
            tool_name: call.name.clone(),
            success: result.success,
        });

        messages.push(Message::tool_result(call.id.clone(), call.name.clone(), result.output));
    }

    ToolsOutcome { messages }
}

/// Scan the most recently added `Tool` messages (bounded look-back of 3)
/// for a role-switch sentinel. Returns the new role only when it differs
/// from the role already active.
pub fn run_state_updater_node(state: &AgentState) -> Option<Role> {
    for message in state.messages.iter().rev().take(ROLE_SWITCH_LOOKBACK) {
        let Message::Tool { content, .. } = message else { continue };
        let Some(line) = content.lines().next() else { continue };
        let Some(role_str) = line.strip_prefix(ROLE_SWITCH_PREFIX) else { continue };
        if let Ok(role) = role_str.parse::<Role>() {
            return if role != state.current_role { Some(role) } else { None };
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message::user(content)
    }

    #[test]
    fn truncate_history_keeps_log_under_limit_untouched() {
        let log = vec![msg("a"), msg("b")];
        assert_eq!(truncate_history(&log, 5), log);
    }

    #[test]
    fn truncate_history_drops_leading_orphan_tool_message() {
        let log = vec![
            Message::user("go"),
            Message::assistant("", vec![crate::message::ToolCall { id: "c1".into(), name: "t".into(), args: serde_json::json!({}) }]),
            Message::tool_result("c1", "t", "r1"),
            Message::assistant("final", vec![]),
        ];
        let truncated = truncate_history(&log, 2);
        assert!(!matches!(truncated.first(), Some(m) if m.is_tool()));
    }

    #[test]
    fn state_updater_finds_sentinel_within_lookback() {
        let mut state = AgentState::new(InteractionMode::Text);
        state.messages.push(Message::user("switch"));
        state.messages.push(Message::assistant("", vec![]));
        state.messages.push(Message::tool_result("c1", "switch_role", format!("{ROLE_SWITCH_PREFIX}vision")));
        assert_eq!(run_state_updater_node(&state), Some(Role::Vision));
    }

    #[test]
    fn state_updater_ignores_sentinel_matching_current_role() {
        let mut state = AgentState::new(InteractionMode::Text);
        state.current_role = Role::Vision;
        state.messages.push(Message::tool_result("c1", "switch_role", format!("{ROLE_SWITCH_PREFIX}vision")));
        assert_eq!(run_state_updater_node(&state), None);
    }

    #[test]
    fn state_updater_ignores_sentinel_outside_lookback() {
        let mut state = AgentState::new(InteractionMode::Text);
        state.messages.push(Message::tool_result("c1", "switch_role", format!("{ROLE_SWITCH_PREFIX}vision")));
        for i in 0..3 {
            state.messages.push(Message::user(format!("filler {i}")));
        }
        assert_eq!(run_state_updater_node(&state), None);
    }

    #[test]
    fn state_updater_none_without_sentinel() {
        let mut state = AgentState::new(InteractionMode::Text);
        state.messages.push(Message::tool_result("c1", "shell_execute", "ok"));
        assert_eq!(run_state_updater_node(&state), None);
    }
}
