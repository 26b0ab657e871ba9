use crate::block::{AuditBlock, GENESIS_PREVIOUS_HASH};

/// A specific defect found while verifying a chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainViolation {
    /// The chain has no blocks at all.
    #[error("chain is empty: missing genesis block")]
    MissingGenesis,

    /// Block 0 does not have the fixed genesis shape.
    #[error("malformed genesis block: {reason}")]
    MalformedGenesis { reason: String },

    /// A block's index does not follow its predecessor's.
    #[error("index gap at block {index}: expected {expected}")]
    IndexGap { index: u64, expected: u64 },

    /// A block's `previous_hash` does not match the prior block's hash.
    #[error("broken link at block {index}: previous_hash does not match prior block")]
    BrokenLink { index: u64 },

    /// A block's stored hash does not match its recomputed digest.
    #[error("hash mismatch at block {index}: stored hash does not match recomputed digest")]
    HashMismatch { index: u64 },

    /// A block's hash does not carry the required difficulty prefix, so
    /// its recorded nonce is not a genuine proof-of-work.
    #[error("insufficient proof-of-work at block {index}: fewer than {difficulty} leading zeros")]
    InsufficientWork { index: u64, difficulty: usize },

    /// A block's payload checksum does not match its `new_data`.
    #[error("payload checksum mismatch at block {index}")]
    ChecksumMismatch { index: u64 },

    /// A block could not be re-serialized for hashing.
    #[error("block {index} is unverifiable: {reason}")]
    Unverifiable { index: u64, reason: String },
}

/// Read-only audit chain verifier.
///
/// Walks the chain front-to-back, recomputing every block's digest from
/// its own fields and confirming the stored hash, the difficulty prefix
/// (proving the recorded nonce is genuine), and the `previous_hash`
/// linkage. Short-circuits on the first defect; never repairs anything:
/// a violated chain requires operator intervention.
#[derive(Clone, Copy, Debug)]
pub struct ChainVerifier {
    difficulty: usize,
}

impl ChainVerifier {
    /// Create a verifier expecting the given proof-of-work difficulty.
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    /// Verify a full chain snapshot.
    pub fn verify(&self, chain: &[AuditBlock]) -> Result<(), ChainViolation> {
        let genesis = chain.first().ok_or(ChainViolation::MissingGenesis)?;
        self.verify_genesis(genesis)?;

        for (i, block) in chain.iter().enumerate().skip(1) {
            let expected = i as u64;
            if block.index != expected {
                return Err(ChainViolation::IndexGap {
                    index: block.index,
                    expected,
                });
            }
            if block.previous_hash != chain[i - 1].hash {
                return Err(ChainViolation::BrokenLink { index: block.index });
            }

            let digest = block.digest_with_nonce(block.nonce).map_err(|e| {
                ChainViolation::Unverifiable {
                    index: block.index,
                    reason: e.to_string(),
                }
            })?;
            if digest.to_hex() != block.hash {
                return Err(ChainViolation::HashMismatch { index: block.index });
            }
            if digest.leading_zero_hex_digits() < self.difficulty {
                return Err(ChainViolation::InsufficientWork {
                    index: block.index,
                    difficulty: self.difficulty,
                });
            }

            let checksum_ok =
                block
                    .payload
                    .verify_checksum()
                    .map_err(|e| ChainViolation::Unverifiable {
                        index: block.index,
                        reason: e.to_string(),
                    })?;
            if !checksum_ok {
                return Err(ChainViolation::ChecksumMismatch { index: block.index });
            }
        }

        Ok(())
    }

    /// Genesis carries no proof-of-work, but its content is still bound
    /// to its stored hash so edits to block 0 are detectable.
    fn verify_genesis(&self, genesis: &AuditBlock) -> Result<(), ChainViolation> {
        if genesis.index != 0 {
            return Err(ChainViolation::MalformedGenesis {
                reason: format!("index {} is not 0", genesis.index),
            });
        }
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
            return Err(ChainViolation::MalformedGenesis {
                reason: format!(
                    "previous_hash {:?} is not {GENESIS_PREVIOUS_HASH:?}",
                    genesis.previous_hash
                ),
            });
        }
        let digest = genesis.digest_with_nonce(genesis.nonce).map_err(|e| {
            ChainViolation::Unverifiable {
                index: 0,
                reason: e.to_string(),
            }
        })?;
        if digest.to_hex() != genesis.hash {
            return Err(ChainViolation::HashMismatch { index: 0 });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use strata_crypto::{CancelToken, ProofOfWork};

    use crate::block::{digest_seal_input, AuditPayload};

    use super::*;

    const DIFFICULTY: usize = 1;

    fn sealed_block(index: u64, previous_hash: &str, user: &str) -> AuditBlock {
        let mut block = AuditBlock {
            index,
            timestamp: "2024-05-01T00:00:00+00:00".to_string(),
            payload: AuditPayload::new(
                "SET",
                "users",
                user,
                None,
                Some(serde_json::json!({"user": user})),
            )
            .unwrap(),
            previous_hash: previous_hash.to_string(),
            nonce: 0,
            hash: String::new(),
        };
        let seal_input = block.seal_input().unwrap();
        let seal = ProofOfWork::new(DIFFICULTY)
            .seal(|nonce| digest_seal_input(&seal_input, nonce), &CancelToken::new())
            .unwrap();
        block.nonce = seal.nonce;
        block.hash = seal.digest.to_hex();
        block
    }

    fn build_chain(blocks: usize) -> Vec<AuditBlock> {
        let mut chain = vec![AuditBlock::genesis().unwrap()];
        for i in 1..=blocks {
            let prev_hash = chain.last().unwrap().hash.clone();
            chain.push(sealed_block(i as u64, &prev_hash, &format!("user-{i}")));
        }
        chain
    }

    #[test]
    fn valid_chain_passes() {
        let verifier = ChainVerifier::new(DIFFICULTY);
        assert!(verifier.verify(&build_chain(0)).is_ok());
        assert!(verifier.verify(&build_chain(5)).is_ok());
    }

    #[test]
    fn empty_chain_is_missing_genesis() {
        let verifier = ChainVerifier::new(DIFFICULTY);
        assert_eq!(
            verifier.verify(&[]).unwrap_err(),
            ChainViolation::MissingGenesis
        );
    }

    #[test]
    fn tampered_payload_detected() {
        let mut chain = build_chain(3);
        chain[2].payload.new_data = Some(serde_json::json!({"user": "mallory"}));
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(err, ChainViolation::HashMismatch { index: 2 });
    }

    #[test]
    fn tampered_nonce_detected() {
        let mut chain = build_chain(2);
        chain[1].nonce += 1;
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(err, ChainViolation::HashMismatch { index: 1 });
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[2].previous_hash = "00".repeat(32);
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(err, ChainViolation::BrokenLink { index: 2 });
    }

    #[test]
    fn index_gap_detected() {
        let mut chain = build_chain(3);
        chain[2].index = 7;
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(
            err,
            ChainViolation::IndexGap {
                index: 7,
                expected: 2
            }
        );
    }

    #[test]
    fn rewritten_hash_fails_difficulty_or_linkage() {
        // An attacker who recomputes a tampered block's hash without
        // redoing the work produces a hash with no difficulty prefix.
        let mut chain = build_chain(2);
        chain[1].payload.user = "mallory".to_string();
        let forged = chain[1].digest_with_nonce(chain[1].nonce).unwrap();
        chain[1].hash = forged.to_hex();

        let err = ChainVerifier::new(4).verify(&chain).unwrap_err();
        assert!(matches!(
            err,
            ChainViolation::InsufficientWork { index: 1, .. } | ChainViolation::BrokenLink { .. }
        ));
    }

    #[test]
    fn checksum_mismatch_detected_when_reseal_is_complete() {
        // Even a fully re-sealed block (hash and work redone) is caught
        // if the payload checksum was not recomputed.
        let mut chain = build_chain(2);
        chain[1].payload.new_data = Some(serde_json::json!({"user": "mallory"}));
        let seal_input = chain[1].seal_input().unwrap();
        let seal = ProofOfWork::new(DIFFICULTY)
            .seal(|nonce| digest_seal_input(&seal_input, nonce), &CancelToken::new())
            .unwrap();
        chain[1].nonce = seal.nonce;
        chain[1].hash = seal.digest.to_hex();

        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(err, ChainViolation::ChecksumMismatch { index: 1 });
    }

    #[test]
    fn tampered_genesis_detected() {
        let mut chain = build_chain(1);
        chain[0].payload.user = "mallory".to_string();
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert_eq!(err, ChainViolation::HashMismatch { index: 0 });
    }

    #[test]
    fn genesis_with_wrong_previous_hash_rejected() {
        let mut chain = build_chain(1);
        chain[0].previous_hash = "1".to_string();
        let err = ChainVerifier::new(DIFFICULTY).verify(&chain).unwrap_err();
        assert!(matches!(err, ChainViolation::MalformedGenesis { .. }));
    }
}
