pub mod engine;
pub mod nodes;

pub use engine::{GraphEngine, NodeKind, TurnHandle, TurnOutcome};
