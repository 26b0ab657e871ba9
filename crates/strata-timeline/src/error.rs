use strata_types::Timestamp;

/// Errors from timeline operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimelineError {
    /// An append carried a timestamp older than the key's newest entry.
    ///
    /// The engine generates timestamps from a strictly increasing clock
    /// at the single write path, so this indicates a clock or caller bug;
    /// it is surfaced, not retried.
    #[error("out-of-order timestamp for key {key:?}: last recorded {last}, attempted {attempted}")]
    OutOfOrderTimestamp {
        key: String,
        last: Timestamp,
        attempted: Timestamp,
    },
}
