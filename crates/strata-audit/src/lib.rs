//! Tamper-evident audit ledger for Strata.
//!
//! Every non-read operation is recorded as an [`AuditBlock`] in an
//! append-only, hash-linked chain. Each block carries the digest of its
//! predecessor and is sealed by a proof-of-work nonce search, so editing
//! any historical block means re-sealing it and every block after it.
//! The chain is persisted as a whole and rewritten by atomic file replace
//! on each append, then re-verified on demand by the [`ChainVerifier`].
//!
//! The ledger is independent of the timeline history: it records who did
//! what, not key versions, and is fed by the same call sites that mutate
//! the store.

pub mod block;
pub mod error;
pub mod ledger;
pub mod verify;

pub use block::{AuditBlock, AuditPayload, GENESIS_PREVIOUS_HASH};
pub use error::AuditError;
pub use ledger::{AuditLedger, LedgerConfig};
pub use verify::{ChainVerifier, ChainViolation};
