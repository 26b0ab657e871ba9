use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Nanosecond-resolution mutation timestamp.
///
/// Timestamps order a key's history and drive as-of-time lookups. They are
/// produced by a [`MonotonicClock`] at the single write path, so within one
/// engine no two mutations ever carry the same timestamp.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Construct from raw nanoseconds since the UNIX epoch.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Raw nanoseconds since the UNIX epoch.
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// The zero timestamp (before any recorded mutation).
    pub const fn zero() -> Self {
        Self(0)
    }

    /// The timestamp one nanosecond after this one.
    pub const fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ns)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Strictly increasing wall-clock timestamp source.
///
/// Reads wall-clock nanoseconds and bumps the result one nanosecond past
/// the previously issued value whenever two reads land in the same
/// nanosecond or the OS clock steps backwards. Successive calls therefore
/// always produce strictly increasing timestamps, which is what keeps a
/// key's history free of ties.
#[derive(Default)]
pub struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    /// Create a clock that has issued no timestamps yet.
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Create a clock that will only issue timestamps after `floor`.
    ///
    /// Used on recovery so freshly issued timestamps always land after
    /// everything already recorded, even if the OS clock stepped back
    /// across the restart.
    pub fn starting_after(floor: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(floor.as_nanos()),
        }
    }

    /// Issue the next timestamp.
    pub fn now(&self) -> Timestamp {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = wall.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Timestamp(candidate),
                Err(observed) => prev = observed,
            }
        }
    }

    /// The most recently issued timestamp, or zero if none was issued.
    pub fn last_issued(&self) -> Timestamp {
        Timestamp(self.last.load(Ordering::Acquire))
    }
}

impl fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("last", &self.last_issued())
            .finish()
    }
}
