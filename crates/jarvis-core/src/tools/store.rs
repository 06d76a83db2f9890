//! In-process backing store shared by `memory_operation`, `knowledge_query`,
//! and `knowledge_ingest`. A real deployment would point this at a vector
//! store or FTS5 database (see the checkpointer's own SQLite idiom); this
//! in-memory implementation is a faithful, testable seam.

use dashmap::DashMap;

/// One stored entry: a freeform key/value memory note, or an ingested
/// knowledge passage keyed by an autogenerated id.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: String,
    pub content: String,
}

#[derive(Default)]
pub struct Store {
    entries: DashMap<String, String>,
}

impl Store {
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    pub fn store(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn forget(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Naive substring/keyword recall over stored entries, most recently
    /// matching key first is not tracked (no ordering guarantees are made
    /// by the specification for recall order).
    pub fn recall(&self, query: &str, limit: usize) -> Vec<Entry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|kv| kv.key().to_lowercase().contains(&query) || kv.value().to_lowercase().contains(&query))
            .take(limit)
            .map(|kv| Entry { key: kv.key().clone(), content: kv.value().clone() })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
