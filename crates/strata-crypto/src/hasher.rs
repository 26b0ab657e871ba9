use strata_types::Digest;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"strata-checksum-v1"`,
/// `"strata-block-v1"`) that is prepended to every hash computation. This
/// prevents cross-type hash collisions: a payload checksum and a block
/// seal over identical bytes produce different digests.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for audit payload checksums.
    pub const CHECKSUM: Self = Self {
        domain: "strata-checksum-v1",
    };
    /// Hasher for audit block seals.
    pub const BLOCK: Self = Self {
        domain: "strata-block-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        Digest::from_hash(*hasher.finalize().as_bytes())
    }

    /// Hash a serializable value as JSON with domain separation.
    pub fn hash_json<T: serde::Serialize>(&self, value: &T) -> Result<Digest, HasherError> {
        let data =
            serde_json::to_vec(value).map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok(self.hash(&data))
    }

    /// Verify that data produces the expected digest.
    pub fn verify(&self, data: &[u8], expected: &Digest) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let data = b"hello world";
        let d1 = ContentHasher::CHECKSUM.hash(data);
        let d2 = ContentHasher::CHECKSUM.hash(data);
        assert_eq!(d1, d2);
    }

    #[test]
    fn different_domains_produce_different_digests() {
        let data = b"same content";
        let checksum = ContentHasher::CHECKSUM.hash(data);
        let block = ContentHasher::BLOCK.hash(data);
        assert_ne!(checksum, block);
    }

    #[test]
    fn verify_correct_data() {
        let data = b"test data";
        let digest = ContentHasher::CHECKSUM.hash(data);
        assert!(ContentHasher::CHECKSUM.verify(data, &digest));
    }

    #[test]
    fn verify_incorrect_data() {
        let digest = ContentHasher::CHECKSUM.hash(b"original");
        assert!(!ContentHasher::CHECKSUM.verify(b"tampered", &digest));
    }

    #[test]
    fn hash_json_works() {
        let value = serde_json::json!({"key": "value", "num": 42});
        let digest = ContentHasher::CHECKSUM.hash_json(&value).unwrap();
        assert_eq!(digest.to_hex().len(), 64);
    }

    #[test]
    fn hash_json_null_is_stable() {
        let none: Option<serde_json::Value> = None;
        let d1 = ContentHasher::CHECKSUM.hash_json(&none).unwrap();
        let d2 = ContentHasher::CHECKSUM.hash_json(&none).unwrap();
        assert_eq!(d1, d2);
    }

    #[test]
    fn custom_domain() {
        let hasher = ContentHasher::new("my-custom-domain-v1");
        let digest = hasher.hash(b"data");
        assert_ne!(digest, ContentHasher::CHECKSUM.hash(b"data"));
    }
}
