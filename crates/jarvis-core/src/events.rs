//! Central pub/sub bus carrying streamed tokens and approval signals
//! between the engine, the safety interceptor, and the driver.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published during the life of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A streamed token produced during the `chatbot` node's LLM call.
    TokenDelta { thread_id: String, delta: String },
    ToolStarted { thread_id: String, tool_name: String, args: serde_json::Value },
    ToolFinished { thread_id: String, tool_name: String, success: bool },
    ApprovalNeeded { thread_id: String, action_id: String, tool_name: String, description: String },
    ApprovalResponse { thread_id: String, action_id: String, approved: bool },
    RoleChanged { thread_id: String, role: String },
}

const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-backed event bus. Every subscriber receives every event;
/// consumers filter for what they care about.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: AppEvent) -> Result<(), String>;
    fn subscribe(&self) -> broadcast::Receiver<AppEvent>;
}

pub struct TokioBroadcastBus {
    sender: broadcast::Sender<AppEvent>,
}

impl TokioBroadcastBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for TokioBroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for TokioBroadcastBus {
    fn publish(&self, event: AppEvent) -> Result<(), String> {
        // `send` errors only when there are zero receivers, which is fine.
        let _ = self.sender.send(event);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_receive() {
        let bus = TokioBroadcastBus::new();
        let mut rx = bus.subscribe();
        bus.publish(AppEvent::TokenDelta { thread_id: "t".into(), delta: "hi".into() }).unwrap();
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, AppEvent::TokenDelta { .. }));
    }

    #[tokio::test]
    async fn multiple_subscribers_all_receive() {
        let bus = TokioBroadcastBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(AppEvent::RoleChanged { thread_id: "t".into(), role: "vision".into() }).unwrap();
        assert!(matches!(a.recv().await.unwrap(), AppEvent::RoleChanged { .. }));
        assert!(matches!(b.recv().await.unwrap(), AppEvent::RoleChanged { .. }));
    }
}
