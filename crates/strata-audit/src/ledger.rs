use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use strata_crypto::{CancelToken, PowError, ProofOfWork};

use crate::block::{digest_seal_input, AuditBlock, AuditPayload};
use crate::error::AuditError;
use crate::verify::ChainVerifier;

/// Configuration for the audit ledger.
#[derive(Clone, Copy, Debug)]
pub struct LedgerConfig {
    /// Required leading zero hex digits on every sealed block hash.
    pub difficulty: usize,
    /// Nonces tried between cancellation checks during sealing.
    pub pow_check_interval: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: 4,
            pow_check_interval: 1024,
        }
    }
}

/// File-backed, hash-chained audit ledger.
///
/// The ledger owns its backing file exclusively and is passed by handle;
/// there is no ambient chain state. Appends are serialized through a
/// mutex (each block's seal depends on the previous block's final hash),
/// and the whole chain is rewritten by atomic file replace after every
/// append so a crash never leaves a partially written file. Readers get
/// snapshots and never block an in-flight seal.
pub struct AuditLedger {
    path: PathBuf,
    config: LedgerConfig,
    chain: Mutex<Vec<AuditBlock>>,
}

impl AuditLedger {
    /// Open the ledger at `path`, creating it with a genesis block if the
    /// file does not exist yet.
    pub fn open(path: &Path, config: LedgerConfig) -> Result<Self, AuditError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let chain = if path.exists() {
            let reader = BufReader::new(File::open(path)?);
            let chain: Vec<AuditBlock> = serde_json::from_reader(reader)
                .map_err(|e| AuditError::Serialization(e.to_string()))?;
            info!(blocks = chain.len(), path = %path.display(), "loaded audit chain");
            chain
        } else {
            let chain = vec![AuditBlock::genesis()?];
            persist_chain(path, &chain)?;
            info!(path = %path.display(), "created audit chain with genesis block");
            chain
        };

        Ok(Self {
            path: path.to_path_buf(),
            config,
            chain: Mutex::new(chain),
        })
    }

    /// Append an audit entry, sealing it with proof-of-work.
    ///
    /// Returns the new block's hash, which callers use as a transaction
    /// identifier.
    pub fn append_entry(
        &self,
        operation: impl Into<String>,
        table: impl Into<String>,
        user: impl Into<String>,
        old_data: Option<Value>,
        new_data: Option<Value>,
    ) -> Result<String, AuditError> {
        self.append_entry_with(operation, table, user, old_data, new_data, &CancelToken::new())
    }

    /// [`append_entry`](Self::append_entry) with a caller-held
    /// cancellation token.
    ///
    /// The nonce search is unbounded in the worst case, so a caller that
    /// cannot tolerate an open-ended stall cancels the token from another
    /// thread; the append then fails with
    /// [`AuditError::ProofOfWorkTimeout`] and persists nothing.
    pub fn append_entry_with(
        &self,
        operation: impl Into<String>,
        table: impl Into<String>,
        user: impl Into<String>,
        old_data: Option<Value>,
        new_data: Option<Value>,
        token: &CancelToken,
    ) -> Result<String, AuditError> {
        let payload = AuditPayload::new(operation, table, user, old_data, new_data)?;

        let mut chain = self.chain.lock().expect("ledger mutex poisoned");
        let previous = chain.last().expect("chain always holds genesis");

        let mut block = AuditBlock {
            index: previous.index + 1,
            timestamp: Utc::now().to_rfc3339(),
            payload,
            previous_hash: previous.hash.clone(),
            nonce: 0,
            hash: String::new(),
        };

        // Serialize the sealable fields once; only the nonce varies
        // across the search.
        let seal_input = block.seal_input()?;
        let pow = ProofOfWork::new(self.config.difficulty)
            .with_check_interval(self.config.pow_check_interval);
        let seal = pow
            .seal(|nonce| digest_seal_input(&seal_input, nonce), token)
            .map_err(|e| match e {
                PowError::Cancelled { attempts } => AuditError::ProofOfWorkTimeout { attempts },
                other => AuditError::ProofOfWork(other),
            })?;

        block.nonce = seal.nonce;
        block.hash = seal.digest.to_hex();
        debug!(
            index = block.index,
            nonce = block.nonce,
            attempts = seal.attempts,
            hash = %block.hash,
            "sealed audit block"
        );

        chain.push(block);
        if let Err(e) = persist_chain(&self.path, &chain) {
            // Keep memory consistent with disk: the append did not happen.
            chain.pop();
            return Err(e);
        }

        Ok(chain.last().expect("block just pushed").hash.clone())
    }

    /// Walk the chain and certify its integrity.
    ///
    /// `false` means the ledger can no longer be trusted; the defect is
    /// reported by [`verify`](Self::verify), never repaired here.
    pub fn verify_chain_integrity(&self) -> bool {
        self.verify().is_ok()
    }

    /// Like [`verify_chain_integrity`](Self::verify_chain_integrity) but
    /// reporting the first defect found.
    pub fn verify(&self) -> Result<(), AuditError> {
        // Verify a snapshot so appends behind the mutex are never read
        // mid-seal.
        let snapshot = self.blocks();
        ChainVerifier::new(self.config.difficulty).verify(&snapshot)?;
        Ok(())
    }

    /// Snapshot of the full chain.
    pub fn blocks(&self) -> Vec<AuditBlock> {
        self.chain.lock().expect("ledger mutex poisoned").clone()
    }

    /// Number of blocks, genesis included.
    pub fn block_count(&self) -> usize {
        self.chain.lock().expect("ledger mutex poisoned").len()
    }

    /// Hash of the newest block.
    pub fn head_hash(&self) -> String {
        self.chain
            .lock()
            .expect("ledger mutex poisoned")
            .last()
            .expect("chain always holds genesis")
            .hash
            .clone()
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger")
            .field("path", &self.path)
            .field("blocks", &self.block_count())
            .field("difficulty", &self.config.difficulty)
            .finish()
    }
}

/// Rewrite the chain file by atomic replace.
fn persist_chain(path: &Path, chain: &[AuditBlock]) -> Result<(), AuditError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new_in(".")?,
    };
    let bytes = serde_json::to_vec_pretty(chain)
        .map_err(|e| AuditError::Serialization(e.to_string()))?;
    tmp.write_all(&bytes)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AuditError::Io(e.error))?;
    Ok(())
}
