//! Write-ahead log for Strata.
//!
//! Every mutation is appended here and flushed to stable storage before it
//! is applied to the flat store; the append is the durability point of
//! the whole write path. On startup the log is replayed front-to-back to
//! re-apply any mutation the flat store lost in a crash; replay is safe to
//! run any number of times because flat-store writes are idempotent.
//!
//! # On-disk format
//!
//! One record per line, fields separated by `|`, timestamp first:
//!
//! ```text
//! <nanos>|SET|<key>|<hex value>|<crc32>
//! <nanos>|DELETE|<key>||<crc32>
//! ```
//!
//! Value bytes are hex-encoded so arbitrary content survives the line
//! framing; keys are validated against the delimiter instead of escaped.
//! The trailing CRC32 covers the rest of the line and lets recovery skip
//! torn or corrupted lines.

pub mod error;
pub mod record;
pub mod wal;

pub use error::{WalError, WalResult};
pub use record::WalRecord;
pub use wal::{SyncMode, WalConfig, WriteAheadLog};
