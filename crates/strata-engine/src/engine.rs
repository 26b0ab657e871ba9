use std::path::Path;
use std::sync::{Mutex, RwLock};

use tracing::{debug, info};

use strata_store::KvStore;
use strata_timeline::{TimelineEntry, TimelineStore};
use strata_types::{MonotonicClock, MutationKind, Timestamp, ValueState};
use strata_wal::{WalConfig, WalRecord, WriteAheadLog};

use crate::error::EngineError;
use crate::notify::{MutationEvent, MutationListener};

/// What startup recovery found in the write-ahead log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records replayed from the log.
    pub replayed: usize,
    /// Records whose apply actually changed the flat store (i.e., the
    /// store had lost them).
    pub reapplied: usize,
}

/// Versioned storage engine: write-ahead log + timeline + flat store.
///
/// All mutations are serialized through a single writer lock so the
/// log-append → store-apply → timeline-append sequence is observed as
/// atomic. Readers never take the writer lock; a key's new version
/// becomes visible only when the lock is released.
pub struct VersionedEngine<S: KvStore> {
    clock: MonotonicClock,
    wal: WriteAheadLog,
    timeline: TimelineStore,
    store: S,
    listeners: RwLock<Vec<MutationListener>>,
    write_lock: Mutex<()>,
}

impl<S: KvStore> VersionedEngine<S> {
    /// Open the engine, replaying the write-ahead log at `wal_path`.
    ///
    /// Replay rebuilds the in-memory timeline and re-applies to the flat
    /// store any record it lost. It is idempotent: replaying the same log
    /// against the same store is a no-op beyond the first pass.
    pub fn open(
        wal_path: &Path,
        wal_config: WalConfig,
        store: S,
    ) -> Result<(Self, RecoveryReport), EngineError> {
        let wal = WriteAheadLog::open(wal_path, wal_config).map_err(EngineError::Recovery)?;
        let records = wal.replay().map_err(EngineError::Recovery)?;

        let timeline = TimelineStore::new();
        let mut report = RecoveryReport {
            replayed: records.len(),
            reapplied: 0,
        };
        let mut max_timestamp = Timestamp::zero();

        for record in &records {
            let current = store.get(&record.key)?;
            let reflected = match (&record.value, &current) {
                (Some(logged), Some(stored)) => logged == stored,
                (None, None) => true,
                _ => false,
            };
            if !reflected {
                match &record.value {
                    Some(value) => store
                        .set(&record.key, value)
                        .map_err(EngineError::StorageApplyFailure)?,
                    None => {
                        store
                            .delete(&record.key)
                            .map_err(EngineError::StorageApplyFailure)?;
                    }
                }
                report.reapplied += 1;
            }

            timeline.append(&record.key, record.timestamp, record.value_state())?;
            max_timestamp = max_timestamp.max(record.timestamp);
        }

        info!(
            replayed = report.replayed,
            reapplied = report.reapplied,
            "versioned engine recovered"
        );

        Ok((
            Self {
                // Seed past everything replayed so new timestamps stay
                // strictly ahead of recorded history even if the OS clock
                // stepped back across the restart.
                clock: MonotonicClock::starting_after(max_timestamp),
                wal,
                timeline,
                store,
                listeners: RwLock::new(Vec::new()),
                write_lock: Mutex::new(()),
            },
            report,
        ))
    }

    /// Write a value.
    pub fn set(&self, key: &str, value: &[u8]) -> Result<(), EngineError> {
        let event = {
            let _guard = self.write_lock.lock().expect("write lock poisoned");
            let timestamp = self.clock.now();

            self.wal
                .append(&WalRecord::set(timestamp, key, value))
                .map_err(EngineError::DurabilityFailure)?;
            self.store
                .set(key, value)
                .map_err(EngineError::StorageApplyFailure)?;
            self.timeline
                .append(key, timestamp, ValueState::Value(value.to_vec()))?;

            debug!(key, timestamp = timestamp.as_nanos(), "set committed");
            MutationEvent {
                timestamp,
                kind: MutationKind::Set,
                key: key.to_string(),
            }
        };
        self.notify(&event);
        Ok(())
    }

    /// Delete a key. Historical versions are retained; the deletion is
    /// recorded as a tombstone in the key's timeline.
    pub fn delete(&self, key: &str) -> Result<(), EngineError> {
        let event = {
            let _guard = self.write_lock.lock().expect("write lock poisoned");
            let timestamp = self.clock.now();

            self.wal
                .append(&WalRecord::delete(timestamp, key))
                .map_err(EngineError::DurabilityFailure)?;
            self.store
                .delete(key)
                .map_err(EngineError::StorageApplyFailure)?;
            self.timeline.append(key, timestamp, ValueState::Tombstone)?;

            debug!(key, timestamp = timestamp.as_nanos(), "delete committed");
            MutationEvent {
                timestamp,
                kind: MutationKind::Delete,
                key: key.to_string(),
            }
        };
        self.notify(&event);
        Ok(())
    }

    /// Current value of a key (pass-through to the flat store).
    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.store.get(key)?)
    }

    /// Value of a key as of a past timestamp.
    ///
    /// Returns `None` if the key had no value then: never written, or
    /// most recently deleted.
    pub fn get_at_time(&self, key: &str, target: Timestamp) -> Option<Vec<u8>> {
        self.timeline.get_at_time(key, target)
    }

    /// Reconstruct rows for the given keys as of a past timestamp.
    ///
    /// Resolves an "as of" table read to one timeline lookup per key;
    /// keys with no value at the target time are omitted. Filtering the
    /// reconstructed rows is the caller's concern.
    pub fn read_as_of<'a, I>(&self, keys: I, target: Timestamp) -> Vec<(String, Vec<u8>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter_map(|key| {
                self.get_at_time(key, target)
                    .map(|value| (key.to_string(), value))
            })
            .collect()
    }

    /// Full recorded history of a key.
    pub fn history(&self, key: &str) -> Vec<TimelineEntry> {
        self.timeline.history(key)
    }

    /// All keys with recorded history, sorted.
    pub fn tracked_keys(&self) -> Vec<String> {
        self.timeline.tracked_keys()
    }

    /// Register a listener invoked after each committed mutation.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&MutationEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push(Box::new(listener));
    }

    /// The wrapped flat store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn notify(&self, event: &MutationEvent) {
        let listeners = self.listeners.read().expect("listener lock poisoned");
        for listener in listeners.iter() {
            listener(event);
        }
    }
}

impl<S: KvStore> std::fmt::Debug for VersionedEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedEngine")
            .field("wal", &self.wal)
            .field("timeline", &self.timeline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use strata_store::{InMemoryKvStore, StoreError, StoreResult};

    use super::*;

    fn open_fresh(dir: &Path) -> VersionedEngine<InMemoryKvStore> {
        let (engine, report) = VersionedEngine::open(
            &dir.join("engine.wal"),
            WalConfig::default(),
            InMemoryKvStore::new(),
        )
        .unwrap();
        assert_eq!(report, RecoveryReport::default());
        engine
    }

    /// Flat store double whose writes can be made to fail on demand.
    struct FlakyStore {
        inner: InMemoryKvStore,
        fail_writes: AtomicBool,
    }

    impl FlakyStore {
        fn new() -> Self {
            Self {
                inner: InMemoryKvStore::new(),
                fail_writes: AtomicBool::new(false),
            }
        }

        fn set_fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("injected write failure".into()));
            }
            Ok(())
        }
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            self.inner.get(key)
        }
        fn set(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            self.check()?;
            self.inner.set(key, value)
        }
        fn delete(&self, key: &str) -> StoreResult<bool> {
            self.check()?;
            self.inner.delete(key)
        }
        fn keys(&self) -> StoreResult<Vec<String>> {
            self.inner.keys()
        }
    }

    // -----------------------------------------------------------------------
    // Basic reads and writes
    // -----------------------------------------------------------------------

    #[test]
    fn set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());
        engine.set("user", b"alice").unwrap();
        assert_eq!(engine.get("user").unwrap(), Some(b"alice".to_vec()));
    }

    #[test]
    fn delete_removes_current_value() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());
        engine.set("user", b"alice").unwrap();
        engine.delete("user").unwrap();
        assert_eq!(engine.get("user").unwrap(), None);
        // History keeps both the write and the tombstone.
        assert_eq!(engine.history("user").len(), 2);
    }

    #[test]
    fn timestamps_strictly_increase_across_keys() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());
        engine.set("a", b"1").unwrap();
        engine.set("b", b"2").unwrap();
        engine.set("a", b"3").unwrap();

        let mut stamps: Vec<Timestamp> = Vec::new();
        for key in ["a", "b"] {
            stamps.extend(engine.history(key).iter().map(|e| e.timestamp));
        }
        stamps.sort();
        for pair in stamps.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    // -----------------------------------------------------------------------
    // Time travel
    // -----------------------------------------------------------------------

    #[test]
    fn get_at_time_reconstructs_past_values() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());
        engine.set("a", b"x").unwrap();
        engine.set("a", b"y").unwrap();
        engine.delete("a").unwrap();

        let history = engine.history("a");
        let (t1, t2, t3) = (
            history[0].timestamp,
            history[1].timestamp,
            history[2].timestamp,
        );

        assert_eq!(engine.get_at_time("a", t1), Some(b"x".to_vec()));
        // Between the two writes the first value is still visible.
        let between = Timestamp::from_nanos((t1.as_nanos() + t2.as_nanos()) / 2);
        assert_eq!(engine.get_at_time("a", between), Some(b"x".to_vec()));
        assert_eq!(engine.get_at_time("a", t2), Some(b"y".to_vec()));
        assert_eq!(engine.get_at_time("a", t3), None);
        assert_eq!(engine.get_at_time("a", t3.next()), None);
    }

    #[test]
    fn read_as_of_reconstructs_rows() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());
        engine.set("users/1", b"alice").unwrap();
        engine.set("users/2", b"bob").unwrap();
        let cutoff = engine.history("users/2")[0].timestamp;
        engine.delete("users/1").unwrap();
        engine.set("users/3", b"carol").unwrap();

        let keys = engine.tracked_keys();
        let rows = engine.read_as_of(keys.iter().map(String::as_str), cutoff);
        // users/1 was still live at the cutoff; users/3 did not exist yet.
        assert_eq!(
            rows,
            vec![
                ("users/1".to_string(), b"alice".to_vec()),
                ("users/2".to_string(), b"bob".to_vec()),
            ]
        );
    }

    // -----------------------------------------------------------------------
    // Durability and recovery
    // -----------------------------------------------------------------------

    #[test]
    fn recovery_restores_state_into_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("engine.wal");

        let (engine, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        engine.set("a", b"one").unwrap();
        engine.set("b", b"two").unwrap();
        engine.delete("a").unwrap();
        let history_before = engine.history("a");
        drop(engine);

        // The flat store was not durable: recover into an empty one.
        let (engine, report) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        assert_eq!(report.replayed, 3);
        assert!(report.reapplied > 0);
        assert_eq!(engine.get("a").unwrap(), None);
        assert_eq!(engine.get("b").unwrap(), Some(b"two".to_vec()));
        // The timeline is rebuilt, so time travel still works.
        assert_eq!(engine.history("a"), history_before);
    }

    #[test]
    fn replay_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("engine.wal");

        let (engine, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        engine.set("a", b"one").unwrap();
        engine.set("a", b"two").unwrap();
        engine.delete("b").unwrap();
        drop(engine);

        let (first, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        let (second, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();

        assert_eq!(first.get("a").unwrap(), second.get("a").unwrap());
        assert_eq!(first.history("a"), second.history("a"));
        assert_eq!(first.tracked_keys(), second.tracked_keys());
    }

    #[test]
    fn recovery_skips_records_already_reflected() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("engine.wal");

        let (engine, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        engine.set("a", b"final").unwrap();
        drop(engine);

        // A store that already reflects the log needs nothing re-applied.
        let prepopulated = InMemoryKvStore::new();
        prepopulated.set("a", b"final").unwrap();
        let (_, report) =
            VersionedEngine::open(&wal_path, WalConfig::default(), prepopulated).unwrap();
        assert_eq!(report.replayed, 1);
        assert_eq!(report.reapplied, 0);
    }

    #[test]
    fn store_failure_after_log_append_is_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let wal_path = dir.path().join("engine.wal");

        let (engine, _) =
            VersionedEngine::open(&wal_path, WalConfig::default(), FlakyStore::new()).unwrap();
        engine.store().set_fail_writes(true);

        let err = engine.set("a", b"survives").unwrap_err();
        assert!(matches!(err, EngineError::StorageApplyFailure(_)));
        // The failed apply left no version behind.
        assert!(engine.history("a").is_empty());
        drop(engine);

        // The record hit the log before the apply failed, so recovery
        // replays it into a healthy store.
        let (engine, report) =
            VersionedEngine::open(&wal_path, WalConfig::default(), InMemoryKvStore::new()).unwrap();
        assert_eq!(report.replayed, 1);
        assert_eq!(engine.get("a").unwrap(), Some(b"survives".to_vec()));
        assert_eq!(engine.history("a").len(), 1);
    }

    #[test]
    fn log_append_failure_aborts_everything() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());

        // A key the log cannot frame never reaches the store or timeline.
        let err = engine.set("bad|key", b"v").unwrap_err();
        assert!(matches!(err, EngineError::DurabilityFailure(_)));
        assert_eq!(engine.get("bad|key").unwrap(), None);
        assert!(engine.tracked_keys().is_empty());
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    #[test]
    fn listeners_observe_committed_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());

        let seen: Arc<Mutex<Vec<MutationEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        engine.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        engine.set("k", b"v").unwrap();
        engine.delete("k").unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, MutationKind::Set);
        assert_eq!(events[0].key, "k");
        assert_eq!(events[1].kind, MutationKind::Delete);
        assert!(events[0].timestamp < events[1].timestamp);
    }

    #[test]
    fn failed_mutation_is_not_announced() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_fresh(dir.path());

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        engine.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let _ = engine.set("bad|key", b"v").unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
