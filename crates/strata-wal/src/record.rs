use strata_types::{MutationKind, Timestamp, ValueState};

use crate::error::{WalError, WalResult};

/// Field separator in the persisted line format.
pub const FIELD_DELIMITER: char = '|';

/// A single logged mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalRecord {
    /// When the mutation was issued.
    pub timestamp: Timestamp,
    /// SET or DELETE.
    pub kind: MutationKind,
    /// The mutated key.
    pub key: String,
    /// The written value; `None` for DELETE.
    pub value: Option<Vec<u8>>,
}

impl WalRecord {
    /// Record for a value write.
    pub fn set(timestamp: Timestamp, key: impl Into<String>, value: &[u8]) -> Self {
        Self {
            timestamp,
            kind: MutationKind::Set,
            key: key.into(),
            value: Some(value.to_vec()),
        }
    }

    /// Record for a deletion.
    pub fn delete(timestamp: Timestamp, key: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind: MutationKind::Delete,
            key: key.into(),
            value: None,
        }
    }

    /// The value state this record produces in a key's history.
    pub fn value_state(&self) -> ValueState {
        match &self.value {
            Some(bytes) => ValueState::Value(bytes.clone()),
            None => ValueState::Tombstone,
        }
    }

    /// Frame this record as a persisted line (without trailing newline).
    ///
    /// Fails if the key cannot be framed; nothing is persisted in that
    /// case, so a rejected key never reaches the log.
    pub fn to_line(&self) -> WalResult<String> {
        if self.key.contains(FIELD_DELIMITER) || self.key.contains('\n') || self.key.contains('\r')
        {
            return Err(WalError::InvalidKey {
                key: self.key.clone(),
            });
        }

        let value_hex = match &self.value {
            Some(bytes) => hex::encode(bytes),
            None => String::new(),
        };
        let body = format!(
            "{}|{}|{}|{}",
            self.timestamp.as_nanos(),
            self.kind.symbol(),
            self.key,
            value_hex
        );
        let crc = crc32fast::hash(body.as_bytes());
        Ok(format!("{body}|{crc:08x}"))
    }

    /// Parse a persisted line back into a record.
    pub fn from_line(line: &str) -> WalResult<Self> {
        let (body, crc_field) = line.rsplit_once(FIELD_DELIMITER).ok_or_else(|| {
            WalError::MalformedLine {
                reason: "missing checksum field".into(),
            }
        })?;

        let expected = u32::from_str_radix(crc_field, 16).map_err(|_| WalError::MalformedLine {
            reason: format!("unparseable checksum field {crc_field:?}"),
        })?;
        let actual = crc32fast::hash(body.as_bytes());
        if actual != expected {
            return Err(WalError::ChecksumMismatch { expected, actual });
        }

        let mut fields = body.split(FIELD_DELIMITER);
        let ts_field = fields.next().unwrap_or_default();
        let kind_field = fields.next().ok_or_else(|| WalError::MalformedLine {
            reason: "missing operation field".into(),
        })?;
        let key_field = fields.next().ok_or_else(|| WalError::MalformedLine {
            reason: "missing key field".into(),
        })?;
        let value_field = fields.next().ok_or_else(|| WalError::MalformedLine {
            reason: "missing value field".into(),
        })?;
        if fields.next().is_some() {
            return Err(WalError::MalformedLine {
                reason: "too many fields".into(),
            });
        }

        let nanos: u64 = ts_field.parse().map_err(|_| WalError::MalformedLine {
            reason: format!("unparseable timestamp {ts_field:?}"),
        })?;
        let kind =
            MutationKind::from_symbol(kind_field).ok_or_else(|| WalError::MalformedLine {
                reason: format!("unknown operation {kind_field:?}"),
            })?;

        let value = match kind {
            MutationKind::Set => {
                let bytes = hex::decode(value_field).map_err(|e| WalError::MalformedLine {
                    reason: format!("unparseable value field: {e}"),
                })?;
                Some(bytes)
            }
            MutationKind::Delete => {
                if !value_field.is_empty() {
                    return Err(WalError::MalformedLine {
                        reason: "DELETE record carries a value".into(),
                    });
                }
                None
            }
        };

        Ok(Self {
            timestamp: Timestamp::from_nanos(nanos),
            kind,
            key: key_field.to_string(),
            value,
        })
    }
}
