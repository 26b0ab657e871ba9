use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strata_types::Digest;

/// Cooperative cancellation flag for an in-flight nonce search.
///
/// Cloned tokens share the same flag: cancelling any clone stops the
/// search. A cancelled search leaves no partial result behind.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the search holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome of a successful nonce search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seal {
    /// The winning nonce.
    pub nonce: u64,
    /// The digest produced by the winning nonce.
    pub digest: Digest,
    /// How many nonces were tried (including the winner).
    pub attempts: u64,
}

/// Difficulty-targeted proof-of-work nonce search.
///
/// Starting at nonce 0, repeatedly evaluates a caller-supplied digest
/// function until the result carries `difficulty` leading zero hex
/// digits. The search is CPU-bound and probabilistically geometric in the
/// difficulty, so it checks its [`CancelToken`] every `check_interval`
/// nonces and aborts cleanly when asked.
#[derive(Clone, Copy, Debug)]
pub struct ProofOfWork {
    difficulty: usize,
    check_interval: u64,
}

impl ProofOfWork {
    /// Create a search targeting the given number of leading zero hex digits.
    pub fn new(difficulty: usize) -> Self {
        Self {
            difficulty,
            check_interval: 1024,
        }
    }

    /// Override how many nonces are tried between cancellation checks.
    pub fn with_check_interval(mut self, check_interval: u64) -> Self {
        self.check_interval = check_interval.max(1);
        self
    }

    /// The difficulty target (leading zero hex digits).
    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Returns `true` if the digest satisfies the difficulty target.
    pub fn meets_target(&self, digest: &Digest) -> bool {
        digest.leading_zero_hex_digits() >= self.difficulty
    }

    /// Search for a nonce whose digest satisfies the difficulty target.
    ///
    /// `digest_for_nonce` must be a pure function of the nonce: the same
    /// nonce must always produce the same digest, or the seal cannot be
    /// re-verified later.
    pub fn seal<F>(&self, digest_for_nonce: F, token: &CancelToken) -> Result<Seal, PowError>
    where
        F: Fn(u64) -> Digest,
    {
        let mut nonce: u64 = 0;
        loop {
            if nonce % self.check_interval == 0 && token.is_cancelled() {
                return Err(PowError::Cancelled { attempts: nonce });
            }

            let digest = digest_for_nonce(nonce);
            if self.meets_target(&digest) {
                return Ok(Seal {
                    nonce,
                    digest,
                    attempts: nonce + 1,
                });
            }

            nonce = nonce.checked_add(1).ok_or(PowError::NonceSpaceExhausted)?;
        }
    }
}

/// Errors from the proof-of-work search.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PowError {
    /// The search was cancelled before finding a winning nonce.
    #[error("nonce search cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    /// All 2^64 nonces were tried without a winner.
    #[error("nonce space exhausted without meeting the difficulty target")]
    NonceSpaceExhausted,
}
