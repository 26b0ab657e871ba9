use std::collections::HashMap;
use std::sync::RwLock;

use strata_types::{Timestamp, ValueState};

use crate::error::TimelineError;

/// One recorded version of a key: a timestamp and a value or tombstone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineEntry {
    /// When the mutation committed.
    pub timestamp: Timestamp,
    /// The value written, or a tombstone for a deletion.
    pub state: ValueState,
}

impl TimelineEntry {
    /// Create an entry.
    pub fn new(timestamp: Timestamp, state: ValueState) -> Self {
        Self { timestamp, state }
    }
}

/// Ordered per-key history of all committed mutations.
///
/// Entries for a key are held in non-decreasing timestamp order; the
/// append path rejects anything older than the key's newest entry. Equal
/// timestamps (possible only for callers bypassing the engine clock)
/// append after their predecessor, and lookups resolve them
/// last-write-wins.
pub struct TimelineStore {
    timelines: RwLock<HashMap<String, Vec<TimelineEntry>>>,
}

impl TimelineStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            timelines: RwLock::new(HashMap::new()),
        }
    }

    /// Append a version to a key's history. O(1) amortized.
    pub fn append(
        &self,
        key: &str,
        timestamp: Timestamp,
        state: ValueState,
    ) -> Result<(), TimelineError> {
        let mut map = self.timelines.write().expect("lock poisoned");
        let timeline = map.entry(key.to_string()).or_default();

        if let Some(last) = timeline.last() {
            if timestamp < last.timestamp {
                return Err(TimelineError::OutOfOrderTimestamp {
                    key: key.to_string(),
                    last: last.timestamp,
                    attempted: timestamp,
                });
            }
        }

        timeline.push(TimelineEntry::new(timestamp, state));
        Ok(())
    }

    /// The value of `key` as of `target`, or `None` if the key had no
    /// value then (never written, or newest qualifying entry is a
    /// tombstone). O(log n) in the key's history length.
    pub fn get_at_time(&self, key: &str, target: Timestamp) -> Option<Vec<u8>> {
        let map = self.timelines.read().expect("lock poisoned");
        let timeline = map.get(key)?;

        // First index whose timestamp is past the target; the entry just
        // before it is the newest one at or before the target. Among
        // equal timestamps this lands after the last appended entry, so
        // ties resolve last-write-wins.
        let idx = timeline.partition_point(|e| e.timestamp <= target);
        if idx == 0 {
            return None;
        }
        match &timeline[idx - 1].state {
            ValueState::Value(bytes) => Some(bytes.clone()),
            ValueState::Tombstone => None,
        }
    }

    /// The full ordered history of a key.
    pub fn history(&self, key: &str) -> Vec<TimelineEntry> {
        let map = self.timelines.read().expect("lock poisoned");
        map.get(key).cloned().unwrap_or_default()
    }

    /// Number of versions recorded for a key.
    pub fn version_count(&self, key: &str) -> usize {
        let map = self.timelines.read().expect("lock poisoned");
        map.get(key).map_or(0, Vec::len)
    }

    /// All keys with at least one recorded version, sorted.
    pub fn tracked_keys(&self) -> Vec<String> {
        let map = self.timelines.read().expect("lock poisoned");
        let mut keys: Vec<String> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns `true` if no key has any recorded version.
    pub fn is_empty(&self) -> bool {
        self.timelines.read().expect("lock poisoned").is_empty()
    }
}

impl Default for TimelineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimelineStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let map = self.timelines.read().expect("lock poisoned");
        let versions: usize = map.values().map(Vec::len).sum();
        f.debug_struct("TimelineStore")
            .field("key_count", &map.len())
            .field("version_count", &versions)
            .finish()
    }
}
