//! Versioned storage engine for Strata.
//!
//! Composes the write-ahead log, the per-key timeline, and a wrapped flat
//! store into one write path:
//!
//! 1. take a timestamp from the strictly increasing clock,
//! 2. append the mutation to the write-ahead log (the durability point;
//!    a failure here aborts the whole call),
//! 3. apply it to the flat store,
//! 4. append the new version to the key's timeline,
//! 5. notify registered listeners.
//!
//! Current-value reads pass through to the flat store; as-of-time reads
//! consult only the timeline. On startup the log is replayed to rebuild
//! the timeline and re-apply anything the flat store lost.

pub mod engine;
pub mod error;
pub mod notify;

pub use engine::{RecoveryReport, VersionedEngine};
pub use error::EngineError;
pub use notify::{MutationEvent, MutationListener};
