pub mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryCheckpointer;
pub use sqlite::SqliteCheckpointer;
pub use traits::{Checkpoint, Checkpointer, StateDelta};
