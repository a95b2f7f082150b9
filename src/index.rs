//! In-memory key index
//!
//! Maps each live key to the log byte-range of its most recent Set record.
//! Purely derived state: rebuilt from the log at startup, on `recover`, and
//! after every compaction; never persisted on its own.

use std::collections::HashMap;

use crate::log::{Command, RecordPos};

/// Index from key to the position of its current record
///
/// Invariant: a key absent from the index has no live value, either because
/// it was never set or because its most recent write was a Remove.
#[derive(Debug, Default)]
pub struct KeyIndex {
    map: HashMap<String, RecordPos>,
}

impl KeyIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh index from replayed records, applied in log order
    pub fn rebuild(records: &[(Command, RecordPos)]) -> Self {
        let mut index = Self::new();
        for (command, pos) in records {
            index.apply(command, *pos);
        }
        index
    }

    /// Apply one command: a Set points the key at its record, a Remove
    /// erases the key (even if it was never present)
    pub fn apply(&mut self, command: &Command, pos: RecordPos) {
        match command {
            Command::Set { key, .. } => {
                self.map.insert(key.clone(), pos);
            }
            Command::Remove { key } => {
                self.map.remove(key);
            }
        }
    }

    /// Look up the record position for a key
    pub fn get(&self, key: &str) -> Option<RecordPos> {
        self.map.get(key).copied()
    }

    /// Iterate over all live keys and their positions
    pub fn iter(&self) -> impl Iterator<Item = (&str, RecordPos)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the index holds no live keys
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
