//! Detached signature verification against the local public key.

use std::path::Path;

use tracing::{debug, info, warn};

use super::sign::read_document;
use super::{load_public_key, KeyLayout};
use crate::crypto::{signature_len, verify_digest, DocumentDigest};
use crate::error::{Result, SealError};
use crate::storage::read_optional;

pub struct VerificationService {
    layout: KeyLayout,
}

impl VerificationService {
    pub fn new(layout: KeyLayout) -> Self {
        Self { layout }
    }

    /// Check `<document>.sig` against `document` and the local public key.
    ///
    /// `Ok(false)` means the signature is well-formed but was not produced by
    /// the paired key over exactly these bytes. Every structural problem is
    /// an error instead:
    ///
    /// - `KeyLoadFailure`: public key missing or unparseable
    /// - `DocumentMissing`
    /// - `SignatureMissing`: no signature file next to the document
    /// - `SignatureMalformed`: signature file is empty
    ///
    /// A signature whose length differs from the key's modulus was made by
    /// another key and gives `Ok(false)`.
    pub fn verify(&self, document: &Path) -> Result<bool> {
        let (public_key, fingerprint) = load_public_key(&self.layout.public_key_path)?;

        let bytes = read_document(document)?;
        let digest = DocumentDigest::compute(&bytes);

        let signature_path = self.layout.signature_path(document);
        let signature = read_optional(&signature_path)?
            .ok_or_else(|| SealError::SignatureMissing(signature_path.clone()))?;

        if signature.is_empty() {
            return Err(SealError::SignatureMalformed {
                path: signature_path,
                reason: "signature file is empty".into(),
            });
        }

        // A signature made by a key of another size cannot match this key.
        let expected = signature_len(&public_key);
        if signature.len() != expected {
            warn!(
                document = %document.display(),
                fingerprint = %fingerprint,
                expected,
                actual = signature.len(),
                "Signature length does not match public key"
            );
            return Ok(false);
        }

        debug!(document = %document.display(), digest = %digest, "Verifying signature");
        let valid = verify_digest(&public_key, &digest, &signature);

        if valid {
            info!(document = %document.display(), fingerprint = %fingerprint, "Signature valid");
        } else {
            warn!(document = %document.display(), fingerprint = %fingerprint, "Signature invalid");
        }
        Ok(valid)
    }
}
