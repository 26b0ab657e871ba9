//! Per-key version history for Strata.
//!
//! Every committed mutation appends a timestamped entry to its key's
//! timeline; nothing is ever removed, so any past value can be
//! reconstructed. Point-in-time reads binary-search a key's ordered
//! entry sequence, so lookup cost grows with that key's history length
//! (O(log n)), not with the number of keys.
//!
//! Retention/compaction of old versions is an explicit extension point
//! and not implemented here.

pub mod error;
pub mod store;

pub use error::TimelineError;
pub use store::{TimelineEntry, TimelineStore};
