//! Key custody services
//!
//! - [`KeyPairService`]: one-time provisioning of a key pair
//! - [`SigningService`]: recover the key with the PIN and sign a document
//! - [`VerificationService`]: check a detached signature against the local public key
//!
//! Each call is self-contained: no key material outlives the call that
//! recovered it, and nothing is shared between calls.

pub mod provision;
pub mod sign;
pub mod verify;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rsa::RsaPublicKey;

pub use provision::{KeyPairService, Provisioned};
pub use sign::{SigningService, Signed};
pub use verify::VerificationService;

use crate::config::KeysConfig;
use crate::crypto::{decode_public_key, KeyFingerprint};
use crate::error::{Result, SealError};
use crate::storage::{decode_base64_text, read_optional};

/// Where the key files and signatures live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub public_key_path: PathBuf,
    pub private_key_file: String,
    pub signature_suffix: String,
}

impl KeyLayout {
    pub fn new(public_key_path: impl Into<PathBuf>) -> Self {
        let defaults = KeysConfig::default();
        Self {
            public_key_path: public_key_path.into(),
            private_key_file: defaults.private_key_file,
            signature_suffix: defaults.signature_suffix,
        }
    }

    /// `<document>` + suffix, e.g. `report.pdf.sig`.
    pub fn signature_path(&self, document: &Path) -> PathBuf {
        let mut name = OsString::from(document.as_os_str());
        name.push(&self.signature_suffix);
        PathBuf::from(name)
    }

    /// Wrapped key location on a given volume root.
    pub fn private_key_path(&self, volume_root: &Path) -> PathBuf {
        volume_root.join(&self.private_key_file)
    }
}

impl From<&KeysConfig> for KeyLayout {
    fn from(keys: &KeysConfig) -> Self {
        Self {
            public_key_path: keys.public_key_path.clone(),
            private_key_file: keys.private_key_file.clone(),
            signature_suffix: keys.signature_suffix.clone(),
        }
    }
}

/// Read and parse the local public key file.
///
/// Every failure, including a missing file, is `KeyLoadFailure`.
pub fn load_public_key(path: &Path) -> Result<(RsaPublicKey, KeyFingerprint)> {
    let load_failure = |reason: String| SealError::KeyLoadFailure {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = read_optional(path)
        .map_err(|e| load_failure(e.to_string()))?
        .ok_or_else(|| load_failure("file not found".into()))?;
    let text = String::from_utf8(bytes).map_err(|_| load_failure("not base64 text".into()))?;
    let der = decode_base64_text(&text).map_err(|e| load_failure(format!("invalid base64: {e}")))?;
    let key = decode_public_key(&der).map_err(load_failure)?;

    Ok((key, KeyFingerprint::of_spki_der(&der)))
}
