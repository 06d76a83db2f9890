//! Human-in-the-loop gating for dangerous tool calls.
//!
//! Invoked by the driver whenever [`crate::graph::TurnOutcome::Suspended`]
//! comes back from a turn. Safety decisions are never cached: every batch
//! of pending tool calls is re-evaluated from scratch.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::events::{AppEvent, EventBus};
use crate::graph::{GraphEngine, TurnHandle};
use crate::message::{Message, ToolCall};
use crate::tools::{Risk, ToolRegistry};

const APPROVE_KEYWORDS: &[&str] = &["yes", "y", "approve", "approved", "confirm", "ok", "okay", "go ahead", "do it", "sure"];
const REJECT_KEYWORDS: &[&str] = &["no", "n", "reject", "rejected", "cancel", "stop", "deny", "don't", "dont", "never mind"];

/// Host-side prompt for dangerous tool approval. The shipped CLI driver
/// implements this over stdin/stdout; a voice driver would implement it
/// over TTS/STT instead.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    async fn ask(&self, description: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Approval {
    Approved,
    Rejected,
}

/// An ambiguous response is treated as rejection: matching `approve` wins
/// only on an unambiguous hit, everything else (including no match at all)
/// rejects.
fn classify_response(raw: &str) -> Approval {
    let text = raw.trim().to_lowercase();
    let approved = APPROVE_KEYWORDS.iter().any(|k| text == *k || text.contains(k));
    let rejected = REJECT_KEYWORDS.iter().any(|k| text == *k || text.contains(k));
    if approved && !rejected { Approval::Approved } else { Approval::Rejected }
}

fn describe_batch(pending: &[ToolCall], tool_registry: &ToolRegistry) -> String {
    pending
        .iter()
        .map(|call| {
            let risk = tool_registry.risk_of(&call.name).map(|r| format!("{r:?}")).unwrap_or_else(|| "unknown".to_string());
            format!("{}({}) [{risk}]", call.name, call.args)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct SafetyInterceptor {
    tool_registry: Arc<ToolRegistry>,
    event_bus: Arc<dyn EventBus>,
    auto_approve_safe: bool,
}

impl SafetyInterceptor {
    pub fn new(tool_registry: Arc<ToolRegistry>, event_bus: Arc<dyn EventBus>, auto_approve_safe: bool) -> Self {
        Self { tool_registry, event_bus, auto_approve_safe }
    }

    /// Resolve one suspended batch of tool calls and resume the engine
    /// accordingly. `pending` comes from [`crate::graph::TurnOutcome::Suspended`].
    pub async fn resolve(&self, engine: &Arc<GraphEngine>, thread_id: &str, pending: Vec<ToolCall>, prompt: &dyn ApprovalPrompt) -> TurnHandle {
        let requires_confirmation = pending.iter().any(|call| self.tool_registry.risk_of(&call.name) != Some(Risk::Safe));

        if !requires_confirmation && self.auto_approve_safe {
            return engine.resume(thread_id);
        }

        let action_id = Uuid::new_v4().to_string();
        let description = describe_batch(&pending, &self.tool_registry);
        let _ = self.event_bus.publish(AppEvent::ApprovalNeeded {
            thread_id: thread_id.to_string(),
            action_id: action_id.clone(),
            tool_name: pending.first().map(|c| c.name.clone()).unwrap_or_default(),
            description: description.clone(),
        });

        let response = prompt.ask(&description).await;
        let decision = classify_response(&response);
        let _ = self.event_bus.publish(AppEvent::ApprovalResponse {
            thread_id: thread_id.to_string(),
            action_id,
            approved: decision == Approval::Approved,
        });

        match decision {
            Approval::Approved => engine.resume(thread_id),
            Approval::Rejected => {
                let messages = pending
                    .iter()
                    .map(|call| {
                        Message::tool_result(
                            call.id.clone(),
                            call.name.clone(),
                            format!("tool call rejected by user, tool `{}` was not executed", call.name),
                        )
                    })
                    .collect();
                engine.inject_and_resume(thread_id, messages, "tools")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_exact_affirmatives_and_negatives() {
        assert_eq!(classify_response("yes"), Approval::Approved);
        assert_eq!(classify_response("Y"), Approval::Approved);
        assert_eq!(classify_response("no"), Approval::Rejected);
        assert_eq!(classify_response("n"), Approval::Rejected);
    }

    #[test]
    fn classify_ambiguous_response_rejects() {
        assert_eq!(classify_response("hmm let me think"), Approval::Rejected);
        assert_eq!(classify_response(""), Approval::Rejected);
    }

    #[test]
    fn classify_phrase_containing_keyword() {
        assert_eq!(classify_response("sure, go ahead"), Approval::Approved);
        assert_eq!(classify_response("please cancel that"), Approval::Rejected);
    }

    #[test]
    fn describe_batch_includes_risk_label() {
        let mut registry = ToolRegistry::new();
        crate::tools::register_builtin_tools(&mut registry, std::env::temp_dir(), reqwest::Client::new());
        let call = ToolCall { id: "c1".into(), name: "shell_execute".into(), args: serde_json::json!({"command": "ls"}) };
        let description = describe_batch(&[call], &registry);
        assert!(description.contains("shell_execute"));
        assert!(description.contains("Dangerous"));
    }
}
