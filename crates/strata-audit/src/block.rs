use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use strata_crypto::ContentHasher;
use strata_types::Digest;

use crate::error::AuditError;

/// `previous_hash` of the genesis block, which links to nothing.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

/// Operation details recorded in an audit block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditPayload {
    /// The operation performed (e.g. `"SET"`, `"DELETE"`, `"EXECUTE"`).
    pub operation: String,
    /// The table (or namespace) the operation touched.
    pub table: String,
    /// Who performed the operation.
    pub user: String,
    /// State before the operation, if the caller captured it.
    pub old_data: Option<Value>,
    /// State after the operation.
    pub new_data: Option<Value>,
    /// Content digest of `new_data`, detecting payload tampering
    /// independently of the chain hash.
    pub checksum: String,
}

impl AuditPayload {
    /// Build a payload, computing the `new_data` checksum.
    pub fn new(
        operation: impl Into<String>,
        table: impl Into<String>,
        user: impl Into<String>,
        old_data: Option<Value>,
        new_data: Option<Value>,
    ) -> Result<Self, AuditError> {
        let checksum = ContentHasher::CHECKSUM
            .hash_json(&new_data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?
            .to_hex();
        Ok(Self {
            operation: operation.into(),
            table: table.into(),
            user: user.into(),
            old_data,
            new_data,
            checksum,
        })
    }

    /// The payload carried by the genesis block.
    pub fn genesis() -> Result<Self, AuditError> {
        Self::new("GENESIS", "", "system", None, None)
    }

    /// Recompute the `new_data` checksum and compare with the stored one.
    pub fn verify_checksum(&self) -> Result<bool, AuditError> {
        let computed = ContentHasher::CHECKSUM
            .hash_json(&self.new_data)
            .map_err(|e| AuditError::Serialization(e.to_string()))?
            .to_hex();
        Ok(computed == self.checksum)
    }
}

/// One sealed entry in the audit chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditBlock {
    /// Position in the chain (genesis is 0).
    pub index: u64,
    /// ISO-8601 creation time.
    pub timestamp: String,
    /// What was done.
    pub payload: AuditPayload,
    /// Hex hash of the preceding block (`"0"` for genesis).
    pub previous_hash: String,
    /// The winning proof-of-work nonce.
    pub nonce: u64,
    /// Hex digest of the sealable fields with `nonce`.
    pub hash: String,
}

/// Serialization view of the sealable fields: every block field except
/// the nonce (appended separately during the search) and the hash itself.
#[derive(Serialize)]
struct SealFields<'a> {
    index: u64,
    timestamp: &'a str,
    payload: &'a AuditPayload,
    previous_hash: &'a str,
}

impl AuditBlock {
    /// The fixed first block of every chain.
    pub fn genesis() -> Result<Self, AuditError> {
        let mut block = Self {
            index: 0,
            timestamp: Utc::now().to_rfc3339(),
            payload: AuditPayload::genesis()?,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        block.hash = block.digest_with_nonce(block.nonce)?.to_hex();
        Ok(block)
    }

    /// Canonical bytes hashed during sealing and verification.
    pub fn seal_input(&self) -> Result<Vec<u8>, AuditError> {
        serde_json::to_vec(&SealFields {
            index: self.index,
            timestamp: &self.timestamp,
            payload: &self.payload,
            previous_hash: &self.previous_hash,
        })
        .map_err(|e| AuditError::Serialization(e.to_string()))
    }

    /// Digest of the sealable fields combined with the given nonce.
    pub fn digest_with_nonce(&self, nonce: u64) -> Result<Digest, AuditError> {
        Ok(digest_seal_input(&self.seal_input()?, nonce))
    }
}

/// Digest of pre-serialized seal input plus a nonce.
///
/// Split out so the proof-of-work search can serialize the block once and
/// vary only the nonce.
pub fn digest_seal_input(seal_input: &[u8], nonce: u64) -> Digest {
    let mut buf = Vec::with_capacity(seal_input.len() + 8);
    buf.extend_from_slice(seal_input);
    buf.extend_from_slice(&nonce.to_le_bytes());
    ContentHasher::BLOCK.hash(&buf)
}
