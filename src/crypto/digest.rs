//! Document content digests.

use std::fmt;

use sha2::{Digest, Sha256};

/// Digest length (SHA-256)
pub const DIGEST_LEN: usize = 32;

/// SHA-256 over a document's raw bytes.
///
/// Recomputed on every sign and verify call; never cached or persisted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DocumentDigest([u8; DIGEST_LEN]);

impl DocumentDigest {
    pub fn compute(document: &[u8]) -> Self {
        Self(Sha256::digest(document).into())
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Display for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for DocumentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentDigest({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let digest = DocumentDigest::compute(b"abc");
        assert_eq!(
            digest.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_single_byte_change_changes_digest() {
        let a = DocumentDigest::compute(b"hello-pdf");
        let b = DocumentDigest::compute(b"hello-pdg");
        assert_ne!(a, b);
        assert_eq!(a.as_bytes().len(), DIGEST_LEN);
    }
}
