use std::io;

use strata_crypto::PowError;

use crate::verify::ChainViolation;

/// Errors from audit ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// I/O error while loading or persisting the chain file.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The chain file or a block could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The proof-of-work search was cancelled before sealing the block.
    /// Nothing was appended or persisted; the caller may retry.
    #[error("proof-of-work search aborted after {attempts} attempts; nothing was persisted")]
    ProofOfWorkTimeout { attempts: u64 },

    /// The proof-of-work search failed for a reason other than
    /// cancellation.
    #[error("proof-of-work search failed: {0}")]
    ProofOfWork(#[source] PowError),

    /// The chain failed verification. Fatal to trust in the ledger;
    /// surfaced to an operator and never auto-repaired.
    #[error("chain integrity violation: {0}")]
    ChainIntegrityViolation(#[from] ChainViolation),
}
