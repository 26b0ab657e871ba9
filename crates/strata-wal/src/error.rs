use std::io;

/// Errors from write-ahead log operations.
#[derive(Debug, thiserror::Error)]
pub enum WalError {
    /// I/O error during append or replay.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The key cannot be framed in the line format.
    #[error("key contains the field delimiter or a line break: {key:?}")]
    InvalidKey { key: String },

    /// A persisted line does not parse as a record.
    #[error("malformed log line: {reason}")]
    MalformedLine { reason: String },

    /// A persisted line fails its CRC32 check (torn or corrupted write).
    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

/// Result alias for write-ahead log operations.
pub type WalResult<T> = Result<T, WalError>;
