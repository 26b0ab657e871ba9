use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of mutation recorded against a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MutationKind {
    /// A value was written.
    Set,
    /// The key was deleted (a tombstone was recorded).
    Delete,
}

impl MutationKind {
    /// Wire symbol used in persisted log lines.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Delete => "DELETE",
        }
    }

    /// Parse from a wire symbol.
    pub fn from_symbol(s: &str) -> Option<Self> {
        match s {
            "SET" => Some(Self::Set),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// A value as it existed at a point in a key's history.
///
/// A tombstone marks a deletion and is distinguishable from "no entry":
/// a key that was deleted at time T has a tombstone entry at T, while a
/// key never written before T has nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueState {
    /// The key held this value.
    Value(Vec<u8>),
    /// The key was deleted.
    Tombstone,
}

impl ValueState {
    /// Returns `true` if this state is a deletion marker.
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Self::Tombstone)
    }

    /// The value bytes, or `None` for a tombstone.
    pub fn as_value(&self) -> Option<&[u8]> {
        match self {
            Self::Value(bytes) => Some(bytes),
            Self::Tombstone => None,
        }
    }

    /// Consume into the value bytes, or `None` for a tombstone.
    pub fn into_value(self) -> Option<Vec<u8>> {
        match self {
            Self::Value(bytes) => Some(bytes),
            Self::Tombstone => None,
        }
    }

    /// The mutation kind that produces this state.
    pub fn kind(&self) -> MutationKind {
        match self {
            Self::Value(_) => MutationKind::Set,
            Self::Tombstone => MutationKind::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_roundtrip() {
        for kind in [MutationKind::Set, MutationKind::Delete] {
            assert_eq!(MutationKind::from_symbol(kind.symbol()), Some(kind));
        }
    }

    #[test]
    fn unknown_symbol_rejected() {
        assert_eq!(MutationKind::from_symbol("UPSERT"), None);
        assert_eq!(MutationKind::from_symbol("set"), None);
    }

    #[test]
    fn display_matches_symbol() {
        assert_eq!(format!("{}", MutationKind::Set), "SET");
        assert_eq!(format!("{}", MutationKind::Delete), "DELETE");
    }

    #[test]
    fn tombstone_has_no_value() {
        let state = ValueState::Tombstone;
        assert!(state.is_tombstone());
        assert_eq!(state.as_value(), None);
        assert_eq!(state.kind(), MutationKind::Delete);
        assert_eq!(state.into_value(), None);
    }

    #[test]
    fn value_state_exposes_bytes() {
        let state = ValueState::Value(b"payload".to_vec());
        assert!(!state.is_tombstone());
        assert_eq!(state.as_value(), Some(&b"payload"[..]));
        assert_eq!(state.kind(), MutationKind::Set);
        assert_eq!(state.into_value(), Some(b"payload".to_vec()));
    }
}
