//! Request/response surface for a user interface.
//!
//! [`Custody`] is built once and handed to whatever drives it (the CLI, a
//! GUI event handler). Each call returns a plain serialisable result; the
//! caller only collects a PIN and a path and renders what comes back.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::crypto::{KeyWrapper, WrappedPrivateKey};
use crate::error::{ErrorKind, Result, SealError};
use crate::media::{ClassifiedVolume, MediaLocator};
use crate::service::{
    load_public_key, KeyLayout, KeyPairService, SigningService, VerificationService,
};
use crate::storage::read_optional;

// =============================================================================
// Results
// =============================================================================

/// A failure as shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&SealError> for ErrorReport {
    fn from(err: &SealError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// `valid` is false both for a bad signature and for any failure; `error`
/// tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Whether the key on the medium and the local public key belong together.
/// Computed from fingerprints alone; no PIN needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingStatus {
    pub private_key_path: Option<PathBuf>,
    pub private_key_fingerprint: Option<String>,
    pub public_key_path: PathBuf,
    pub public_key_fingerprint: Option<String>,
    pub paired: bool,
    pub issues: Vec<ErrorReport>,
}

// =============================================================================
// Custody
// =============================================================================

pub struct Custody {
    locator: Arc<MediaLocator>,
    wrapper: KeyWrapper,
    layout: KeyLayout,
    key_bits: usize,
}

impl Custody {
    /// Build over an explicit locator; `config` supplies everything else.
    pub fn new(locator: MediaLocator, config: &Config) -> Self {
        Self {
            locator: Arc::new(locator),
            wrapper: KeyWrapper::new(config.kdf),
            layout: KeyLayout::from(&config.keys),
            key_bits: config.keys.key_bits,
        }
    }

    /// Validate `config` and build over the host's mounted volumes.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(MediaLocator::from_config(&config.media), config))
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn key_pairs(&self) -> KeyPairService {
        KeyPairService::new(
            Arc::clone(&self.locator),
            self.wrapper.clone(),
            self.layout.clone(),
            self.key_bits,
        )
    }

    pub fn signer(&self) -> SigningService {
        SigningService::new(
            Arc::clone(&self.locator),
            self.wrapper.clone(),
            self.layout.clone(),
        )
    }

    pub fn verifier(&self) -> VerificationService {
        VerificationService::new(self.layout.clone())
    }

    pub fn provision(&self, pin: &str, force: bool) -> ProvisionResult {
        match self.key_pairs().provision(pin, force) {
            Ok(provisioned) => ProvisionResult {
                ok: true,
                volume_path: Some(provisioned.volume_path),
                fingerprint: Some(provisioned.fingerprint),
                error: None,
            },
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Provisioning failed");
                ProvisionResult {
                    ok: false,
                    volume_path: None,
                    fingerprint: None,
                    error: Some(ErrorReport::from(&e)),
                }
            }
        }
    }

    pub fn sign(&self, document: &Path, pin: &str) -> SignResult {
        match self.signer().sign(document, pin) {
            Ok(signed) => SignResult {
                ok: true,
                signature_path: Some(signed.signature_path),
                error: None,
            },
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Signing failed");
                SignResult {
                    ok: false,
                    signature_path: None,
                    error: Some(ErrorReport::from(&e)),
                }
            }
        }
    }

    pub fn verify(&self, document: &Path) -> VerifyResult {
        match self.verifier().verify(document) {
            Ok(valid) => VerifyResult { valid, error: None },
            Err(e) => {
                warn!(kind = ?e.kind(), error = %e, "Verification failed");
                VerifyResult {
                    valid: false,
                    error: Some(ErrorReport::from(&e)),
                }
            }
        }
    }

    /// Report which key files are present and whether they pair up.
    pub fn status(&self) -> PairingStatus {
        let mut issues = Vec::new();

        let private_key_path = self.locator.find_file(&self.layout.private_key_file);
        let private_fingerprint = match &private_key_path {
            Some(path) => match read_envelope(path) {
                Ok(wrapped) => Some(wrapped.fingerprint),
                Err(e) => {
                    issues.push(ErrorReport::from(&e));
                    None
                }
            },
            None => {
                issues.push(ErrorReport::from(&SealError::KeyNotFound(
                    self.layout.private_key_file.clone(),
                )));
                None
            }
        };

        let public_fingerprint = match load_public_key(&self.layout.public_key_path) {
            Ok((_, fingerprint)) => Some(fingerprint),
            Err(e) => {
                issues.push(ErrorReport::from(&e));
                None
            }
        };

        let paired = matches!(
            (&private_fingerprint, &public_fingerprint),
            (Some(a), Some(b)) if a == b
        );

        PairingStatus {
            private_key_path,
            private_key_fingerprint: private_fingerprint.map(|f| f.to_hex()),
            public_key_path: self.layout.public_key_path.clone(),
            public_key_fingerprint: public_fingerprint.map(|f| f.to_hex()),
            paired,
            issues,
        }
    }

    pub fn volumes(&self) -> Vec<ClassifiedVolume> {
        self.locator.volumes()
    }
}

/// Parse the wrapped key header without the PIN.
fn read_envelope(path: &Path) -> Result<WrappedPrivateKey> {
    let bytes = read_optional(path)?
        .ok_or_else(|| SealError::KeyNotFound(path.display().to_string()))?;
    let text = String::from_utf8(bytes).map_err(|_| SealError::DecryptFailure)?;
    Ok(WrappedPrivateKey::from_base64(&text)?)
}
