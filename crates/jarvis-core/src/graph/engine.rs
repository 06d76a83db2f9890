//! The `{chatbot, tools, state_updater}` state machine.
//!
//! Suspend/resume is not a language-level coroutine: every step between
//! nodes goes through the [`Checkpointer`], and "interrupt before tools" is
//! implemented as a checkpoint the engine declines to advance past until
//! told to.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use petgraph::graph::DiGraph;
use tokio::sync::{broadcast, oneshot};

use crate::checkpoint::{Checkpointer, StateDelta};
use crate::config::CoreConfig;
use crate::error::EngineError;
use crate::events::{AppEvent, EventBus};
use crate::llm::LLMFactory;
use crate::message::{InteractionMode, Message, ToolCall};
use crate::state::AgentState;
use crate::tools::ToolRegistry;

use super::nodes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Chatbot,
    Tools,
    StateUpdater,
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Chatbot => nodes::CHATBOT,
            NodeKind::Tools => nodes::TOOLS,
            NodeKind::StateUpdater => nodes::STATE_UPDATER,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            nodes::CHATBOT => Some(NodeKind::Chatbot),
            nodes::TOOLS => Some(NodeKind::Tools),
            nodes::STATE_UPDATER => Some(NodeKind::StateUpdater),
            _ => None,
        }
    }
}

/// The fixed `chatbot -> tools -> state_updater -> chatbot` topology as an
/// explicit graph value, rather than a hand-rolled `match` chain. The
/// `chatbot -> tools` edge is conditional on the LLM producing tool calls
/// (decided in [`nodes::run_chatbot_node`]); the other two edges are
/// unconditional and are walked via [`Topology::successors`].
struct Topology {
    graph: DiGraph<NodeKind, ()>,
}

impl Topology {
    fn fixed() -> Self {
        let mut graph = DiGraph::new();
        let chatbot = graph.add_node(NodeKind::Chatbot);
        let tools = graph.add_node(NodeKind::Tools);
        let state_updater = graph.add_node(NodeKind::StateUpdater);
        graph.add_edge(chatbot, tools, ());
        graph.add_edge(tools, state_updater, ());
        graph.add_edge(state_updater, chatbot, ());
        Self { graph }
    }

    fn successor(&self, node: NodeKind) -> Option<NodeKind> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx] == node)
            .and_then(|idx| self.graph.neighbors(idx).next())
            .map(|idx| self.graph[idx])
    }
}

/// The result of `handle.wait()`.
#[derive(Debug)]
pub enum TurnOutcome {
    Finished(String),
    Suspended(Vec<ToolCall>),
    Failed(EngineError),
}

/// A handle to a turn running in the background. Tokens published during
/// the `chatbot` node's LLM call are available through [`TurnHandle::stream`]
/// concurrently with awaiting the final outcome.
pub struct TurnHandle {
    thread_id: String,
    outcome_rx: oneshot::Receiver<TurnOutcome>,
    event_bus: Arc<dyn EventBus>,
    cancel: Arc<AtomicBool>,
}

impl TurnHandle {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn stream(&self) -> broadcast::Receiver<AppEvent> {
        self.event_bus.subscribe()
    }

    pub async fn wait(self) -> TurnOutcome {
        self.outcome_rx.await.unwrap_or(TurnOutcome::Failed(EngineError::Cancelled))
    }

    /// Cooperative cancellation: the engine checks at the next suspension
    /// point. A tool invocation already in flight is always let to finish.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

fn pending_tool_calls(state: &AgentState) -> Vec<ToolCall> {
    state.messages.last().map(|m| m.tool_calls().to_vec()).unwrap_or_default()
}

pub struct GraphEngine {
    checkpointer: Arc<dyn Checkpointer>,
    tool_registry: Arc<ToolRegistry>,
    llm_factory: Arc<LLMFactory>,
    event_bus: Arc<dyn EventBus>,
    config: Arc<CoreConfig>,
    break_before: HashSet<NodeKind>,
    topology: Topology,
}

impl GraphEngine {
    /// `safety_enabled` controls the break-before set: `{tools}` when on
    /// (the default), empty when off (`--no-safety`).
    pub fn new(
        checkpointer: Arc<dyn Checkpointer>,
        tool_registry: Arc<ToolRegistry>,
        llm_factory: Arc<LLMFactory>,
        event_bus: Arc<dyn EventBus>,
        config: Arc<CoreConfig>,
        safety_enabled: bool,
    ) -> Arc<Self> {
        let mut break_before = HashSet::new();
        if safety_enabled {
            break_before.insert(NodeKind::Tools);
        }
        Arc::new(Self { checkpointer, tool_registry, llm_factory, event_bus, config, break_before, topology: Topology::fixed() })
    }

    pub fn tool_registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Append a user message and drive the graph until it is quiescent or
    /// suspended. Bootstraps a fresh [`AgentState`] in `mode` if this thread
    /// has no prior checkpoint.
    pub fn start_turn(self: &Arc<Self>, thread_id: impl Into<String>, user_text: impl Into<String>, mode: InteractionMode) -> TurnHandle {
        let thread_id = thread_id.into();
        let user_message = Message::user(user_text.into());

        let engine = Arc::clone(self);
        let thread_for_task = thread_id.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_task = Arc::clone(&cancel);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let bootstrap = engine.checkpointer.get_latest(&thread_for_task).await;
            let write_result = match bootstrap {
                Ok(None) => {
                    let fresh = crate::checkpoint::Checkpoint { state: AgentState::new(mode), next: vec![], version: 1 };
                    match engine.checkpointer.put(&thread_for_task, fresh).await {
                        Ok(()) => Ok(()),
                        Err(err) => Err(err),
                    }
                }
                Ok(Some(_)) => Ok(()),
                Err(err) => Err(err),
            };

            let outcome = match write_result {
                Ok(()) => {
                    let delta = StateDelta { messages: vec![user_message], current_role: None };
                    match engine.checkpointer.update_partial(&thread_for_task, delta, vec![nodes::CHATBOT.to_string()], "driver").await {
                        Ok(_) => Self::run(Arc::clone(&engine), thread_for_task, true, cancel_for_task).await,
                        Err(err) => TurnOutcome::Failed(err),
                    }
                }
                Err(err) => TurnOutcome::Failed(err),
            };
            let _ = tx.send(outcome);
        });

        TurnHandle { thread_id, outcome_rx: rx, event_bus: self.event_bus(), cancel }
    }

    /// Replay from the last persisted checkpoint without adding messages —
    /// used after a safety approval.
    pub fn resume(self: &Arc<Self>, thread_id: impl Into<String>) -> TurnHandle {
        self.resume_inner(thread_id.into(), true)
    }

    /// Write `messages` as if produced by `as_if_from_node`, advance past
    /// it, and resume — used after a safety rejection.
    pub fn inject_and_resume(self: &Arc<Self>, thread_id: impl Into<String>, messages: Vec<Message>, as_if_from_node: &str) -> TurnHandle {
        let thread_id = thread_id.into();
        let produced_by = as_if_from_node.to_string();
        let next_node = NodeKind::parse(as_if_from_node).and_then(|node| self.topology.successor(node));
        let next = next_node.map(|n| vec![n.name().to_string()]).unwrap_or_default();

        let engine = Arc::clone(self);
        let thread_for_task = thread_id.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_task = Arc::clone(&cancel);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let delta = StateDelta { messages, current_role: None };
            let outcome = match engine.checkpointer.update_partial(&thread_for_task, delta, next, &produced_by).await {
                Ok(_) => Self::run(Arc::clone(&engine), thread_for_task, true, cancel_for_task).await,
                Err(err) => TurnOutcome::Failed(err),
            };
            let _ = tx.send(outcome);
        });

        TurnHandle { thread_id, outcome_rx: rx, event_bus: self.event_bus(), cancel }
    }

    fn resume_inner(self: &Arc<Self>, thread_id: String, skip_break_once: bool) -> TurnHandle {
        let engine = Arc::clone(self);
        let thread_for_task = thread_id.clone();
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_for_task = Arc::clone(&cancel);
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let outcome = Self::run(engine, thread_for_task, skip_break_once, cancel_for_task).await;
            let _ = tx.send(outcome);
        });

        TurnHandle { thread_id, outcome_rx: rx, event_bus: self.event_bus(), cancel }
    }

    #[tracing::instrument(skip_all, fields(thread_id = %thread_id))]
    async fn run(self: Arc<Self>, thread_id: String, skip_break_once: bool, cancel: Arc<AtomicBool>) -> TurnOutcome {
        let mut skip_break = skip_break_once;

        loop {
            if cancel.load(Ordering::Relaxed) {
                return TurnOutcome::Failed(EngineError::Cancelled);
            }

            let checkpoint = match self.checkpointer.get_latest(&thread_id).await {
                Ok(Some(cp)) => cp,
                Ok(None) => return TurnOutcome::Failed(EngineError::CheckpointerWrite("no checkpoint for thread".to_string())),
                Err(err) => return TurnOutcome::Failed(err),
            };

            if checkpoint.next.is_empty() {
                let text = match checkpoint.state.last_assistant() {
                    Some(Message::Assistant { content, .. }) => content.clone(),
                    _ => String::new(),
                };
                return TurnOutcome::Finished(text);
            }

            let Some(node) = NodeKind::parse(&checkpoint.next[0]) else {
                return TurnOutcome::Failed(EngineError::CheckpointerWrite(format!("unknown node in checkpoint: {}", checkpoint.next[0])));
            };

            if self.break_before.contains(&node) && !skip_break {
                return TurnOutcome::Suspended(pending_tool_calls(&checkpoint.state));
            }
            skip_break = false;

            let write_result = match node {
                NodeKind::Chatbot => {
                    let outcome =
                        nodes::run_chatbot_node(&checkpoint.state, &self.config, &self.llm_factory, &self.tool_registry, &self.event_bus, &thread_id)
                            .await;
                    let delta = StateDelta { messages: vec![outcome.message], current_role: None };
                    self.checkpointer.update_partial(&thread_id, delta, outcome.next, nodes::CHATBOT).await
                }
                NodeKind::Tools => {
                    let outcome = nodes::run_tools_node(&checkpoint.state, &self.tool_registry, &self.event_bus, &thread_id).await;
                    let next = self.topology.successor(NodeKind::Tools).map(|n| vec![n.name().to_string()]).unwrap_or_default();
                    let delta = StateDelta { messages: outcome.messages, current_role: None };
                    self.checkpointer.update_partial(&thread_id, delta, next, nodes::TOOLS).await
                }
                NodeKind::StateUpdater => {
                    let new_role = nodes::run_state_updater_node(&checkpoint.state);
                    if let Some(role) = new_role {
                        let _ = self.event_bus.publish(AppEvent::RoleChanged { thread_id: thread_id.clone(), role: role.to_string() });
                    }
                    let next = self.topology.successor(NodeKind::StateUpdater).map(|n| vec![n.name().to_string()]).unwrap_or_default();
                    let delta = StateDelta { messages: vec![], current_role: new_role };
                    self.checkpointer.update_partial(&thread_id, delta, next, nodes::STATE_UPDATER).await
                }
            };

            if let Err(err) = write_result {
                return TurnOutcome::Failed(err);
            }
        }
    }
}
