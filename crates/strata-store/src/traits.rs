use crate::error::StoreResult;

/// Flat key-value store holding current values only.
///
/// All implementations must satisfy these invariants:
/// - `set` followed by `get` of the same key returns the set value.
/// - `set` and `delete` are idempotent: applying the same operation twice
///   leaves the store in the same state as applying it once.
/// - Concurrent reads are always safe; writers are serialized by the
///   engine above this seam, not by the store.
/// - No durability is assumed; the write-ahead log in front of the store
///   is the durability point.
pub trait KvStore: Send + Sync {
    /// Read the current value of a key.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Write a value, replacing any existing value for the key.
    fn set(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove a key. Returns `true` if the key existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// All keys currently present, sorted.
    ///
    /// Used by as-of-time table reads to enumerate candidate rows.
    fn keys(&self) -> StoreResult<Vec<String>>;
}
