//! Document signing with the PIN-wrapped key
//!
//! Flow:
//! 1. Find `private_key.enc` on a mounted volume
//! 2. Unwrap it with the PIN
//! 3. Rebuild the private key and check it against the envelope fingerprint
//! 4. Digest the document
//! 5. Sign the digest and write `<document>.sig`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::KeyLayout;
use crate::crypto::{
    decode_private_key, sign_digest, DocumentDigest, KeyFingerprint, KeyWrapper,
    WrappedPrivateKey,
};
use crate::error::{Result, SealError};
use crate::media::MediaLocator;
use crate::storage::{self, read_optional};

/// Outcome of a successful signing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signed {
    pub signature_path: PathBuf,
    /// Hex SHA-256 of the signed document bytes
    pub digest: String,
    /// Fingerprint of the key that produced the signature
    pub fingerprint: String,
}

pub struct SigningService {
    locator: Arc<MediaLocator>,
    wrapper: KeyWrapper,
    layout: KeyLayout,
}

impl SigningService {
    pub fn new(locator: Arc<MediaLocator>, wrapper: KeyWrapper, layout: KeyLayout) -> Self {
        Self {
            locator,
            wrapper,
            layout,
        }
    }

    /// Sign `document` with the key on the removable medium.
    ///
    /// Any existing signature for the document is replaced. On failure the
    /// previous signature file, if any, is left as it was.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound`: no volume holds the wrapped key
    /// - `DecryptFailure`: wrong PIN, or the key file is corrupt
    /// - `KeyParseFailure`: the unwrapped bytes are not the paired private key
    /// - `DocumentMissing` / `Io`: the document cannot be read, or the
    ///   signature cannot be written
    pub fn sign(&self, document: &Path, pin: &str) -> Result<Signed> {
        let (private_key, fingerprint) = self.recover_key(pin)?;

        let bytes = read_document(document)?;
        let digest = DocumentDigest::compute(&bytes);
        debug!(document = %document.display(), digest = %digest, "Computed document digest");

        let signature = sign_digest(private_key, &digest)?;

        let signature_path =
            storage::write_atomic(self.layout.signature_path(document), &signature)?;

        info!(
            document = %document.display(),
            signature = %signature_path.display(),
            fingerprint = %fingerprint,
            "Document signed"
        );

        Ok(Signed {
            signature_path,
            digest: digest.to_string(),
            fingerprint: fingerprint.to_hex(),
        })
    }

    /// Locate, unwrap and parse the private key.
    fn recover_key(&self, pin: &str) -> Result<(rsa::RsaPrivateKey, KeyFingerprint)> {
        let key_file = &self.layout.private_key_file;
        let path = self
            .locator
            .find_file(key_file)
            .ok_or_else(|| SealError::KeyNotFound(key_file.clone()))?;

        let bytes =
            read_optional(&path)?.ok_or_else(|| SealError::KeyNotFound(key_file.clone()))?;
        let text = String::from_utf8(bytes).map_err(|_| SealError::DecryptFailure)?;
        let wrapped = WrappedPrivateKey::from_base64(&text)?;

        let plain = self.wrapper.unwrap(&wrapped, pin)?;
        let private_key = decode_private_key(&plain)?;

        let actual = KeyFingerprint::of_public_key(&private_key.to_public_key())?;
        if actual != wrapped.fingerprint {
            return Err(SealError::KeyParseFailure(format!(
                "key fingerprint {actual} does not match envelope fingerprint {}",
                wrapped.fingerprint
            )));
        }

        Ok((private_key, actual))
    }
}

/// Read a whole document; a missing file is `DocumentMissing`, not `Io`.
pub(crate) fn read_document(document: &Path) -> Result<Vec<u8>> {
    match fs::read(document) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(SealError::DocumentMissing(document.to_path_buf()))
        }
        Err(e) => Err(SealError::io(document, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encode_private_key, encode_public_key, generate_keypair, KdfParams};
    use crate::media::{BootVolumeClassifier, StaticVolumes, Volume};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        usb: PathBuf,
        service: SigningService,
        wrapper: KeyWrapper,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system");
        let usb = dir.path().join("usb");
        fs::create_dir_all(&system).unwrap();
        fs::create_dir_all(&usb).unwrap();

        let locator = MediaLocator::new(
            StaticVolumes(vec![Volume::at(&system, false), Volume::at(&usb, true)]),
            BootVolumeClassifier::new(vec![system], false),
        );
        let wrapper = KeyWrapper::new(KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        });
        let service = SigningService::new(
            Arc::new(locator),
            wrapper.clone(),
            KeyLayout::new(dir.path().join("public_key.pem")),
        );
        Fixture {
            dir,
            usb,
            service,
            wrapper,
        }
    }

    /// Write a wrapped key to the fake USB volume, returning its fingerprint.
    fn install_key(
        f: &Fixture,
        pin: &str,
        fingerprint_override: Option<KeyFingerprint>,
    ) -> KeyFingerprint {
        let (private_key, public_key) = generate_keypair(2048).unwrap();
        let fingerprint = KeyFingerprint::of_spki_der(&encode_public_key(&public_key).unwrap());
        let der = encode_private_key(&private_key).unwrap();
        let wrapped = f
            .wrapper
            .wrap(&der, pin, fingerprint_override.unwrap_or(fingerprint))
            .unwrap();
        fs::write(f.usb.join("private_key.enc"), wrapped.to_base64()).unwrap();
        fingerprint
    }

    #[test]
    fn test_sign_writes_signature_next_to_document() {
        let f = fixture();
        let fingerprint = install_key(&f, "1234", None);
        let document = f.dir.path().join("report.pdf");
        fs::write(&document, b"hello-pdf\n").unwrap();

        let signed = f.service.sign(&document, "1234").unwrap();

        assert_eq!(signed.signature_path, f.dir.path().join("report.pdf.sig"));
        assert_eq!(fs::read(&signed.signature_path).unwrap().len(), 256);
        assert_eq!(signed.fingerprint, fingerprint.to_hex());
        assert_eq!(signed.digest, DocumentDigest::compute(b"hello-pdf\n").to_string());
    }

    #[test]
    fn test_missing_key_file() {
        let f = fixture();
        let document = f.dir.path().join("report.pdf");
        fs::write(&document, b"x").unwrap();

        assert!(matches!(
            f.service.sign(&document, "1234"),
            Err(SealError::KeyNotFound(name)) if name == "private_key.enc"
        ));
    }

    #[test]
    fn test_wrong_pin_and_corrupt_file_are_decrypt_failures() {
        let f = fixture();
        install_key(&f, "1234", None);
        let document = f.dir.path().join("report.pdf");
        fs::write(&document, b"x").unwrap();

        assert!(matches!(
            f.service.sign(&document, "4321"),
            Err(SealError::DecryptFailure)
        ));

        fs::write(f.usb.join("private_key.enc"), "garbage").unwrap();
        assert!(matches!(
            f.service.sign(&document, "1234"),
            Err(SealError::DecryptFailure)
        ));
        assert!(!f.dir.path().join("report.pdf.sig").exists());
    }

    #[test]
    fn test_fingerprint_mismatch_is_parse_failure() {
        let f = fixture();
        install_key(&f, "1234", Some(KeyFingerprint::from_bytes([7; 32])));
        let document = f.dir.path().join("report.pdf");
        fs::write(&document, b"x").unwrap();

        assert!(matches!(
            f.service.sign(&document, "1234"),
            Err(SealError::KeyParseFailure(_))
        ));
    }

    #[test]
    fn test_non_key_plaintext_is_parse_failure() {
        let f = fixture();
        let wrapped = f
            .wrapper
            .wrap(b"not a pkcs8 key", "1234", KeyFingerprint::from_bytes([0; 32]))
            .unwrap();
        fs::write(f.usb.join("private_key.enc"), wrapped.to_base64()).unwrap();
        let document = f.dir.path().join("report.pdf");
        fs::write(&document, b"x").unwrap();

        assert!(matches!(
            f.service.sign(&document, "1234"),
            Err(SealError::KeyParseFailure(_))
        ));
    }

    #[test]
    fn test_missing_document() {
        let f = fixture();
        install_key(&f, "1234", None);
        let document = f.dir.path().join("absent.pdf");

        assert!(matches!(
            f.service.sign(&document, "1234"),
            Err(SealError::DocumentMissing(p)) if p == document
        ));
        assert!(!f.dir.path().join("absent.pdf.sig").exists());
    }
}
