//! Key pair provisioning
//!
//! Runs once per key pair:
//! 1. Find a writable removable volume (nothing is generated without one)
//! 2. Generate a fresh RSA key pair
//! 3. Wrap the PKCS#8 private key under the PIN
//! 4. Write the wrapped key to `<volume>/private_key.enc`
//! 5. Write the base64 SPKI public key to the local public key path

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::KeyLayout;
use crate::crypto::{
    encode_private_key, encode_public_key, generate_keypair, KeyFingerprint, KeyWrapper,
};
use crate::error::{Result, SealError};
use crate::media::MediaLocator;
use crate::storage::{self, encode_base64};

/// Where a freshly provisioned key pair was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub volume_path: PathBuf,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    /// Hex SHA-256 of the public key SPKI
    pub fingerprint: String,
}

pub struct KeyPairService {
    locator: Arc<MediaLocator>,
    wrapper: KeyWrapper,
    layout: KeyLayout,
    key_bits: usize,
}

impl KeyPairService {
    pub fn new(
        locator: Arc<MediaLocator>,
        wrapper: KeyWrapper,
        layout: KeyLayout,
        key_bits: usize,
    ) -> Self {
        Self {
            locator,
            wrapper,
            layout,
            key_bits,
        }
    }

    /// Generate a key pair, wrap the private half onto removable media and
    /// keep the public half locally.
    ///
    /// # Arguments
    ///
    /// - `pin`: Operator PIN the private key is wrapped under
    /// - `force`: Replace an existing key pair instead of refusing
    ///
    /// # Errors
    ///
    /// - `NoRemovableMedia` when no writable external volume is mounted; no
    ///   key is generated and nothing is written
    /// - `KeyPairExists` when either key file already exists and `force` is off
    /// - `Io` / `CryptoFailure` for write or generation faults
    ///
    /// Both files are fully staged before either is moved into place.
    pub fn provision(&self, pin: &str, force: bool) -> Result<Provisioned> {
        // 1. Locate the medium
        let volume = self
            .locator
            .find_writable_external_volume()
            .ok_or(SealError::NoRemovableMedia)?;
        let private_key_path = self.layout.private_key_path(&volume.mount_point);
        let public_key_path = self.layout.public_key_path.clone();

        for existing in [&private_key_path, &public_key_path] {
            if existing.exists() {
                if !force {
                    return Err(SealError::KeyPairExists(existing.clone()));
                }
                warn!(path = %existing.display(), "Replacing existing key file");
            }
        }

        // 2. Generate
        let (private_key, public_key) = generate_keypair(self.key_bits)?;
        let public_der = encode_public_key(&public_key)?;
        let fingerprint = KeyFingerprint::of_spki_der(&public_der);

        // 3. Wrap
        let private_der = encode_private_key(&private_key)?;
        drop(private_key);
        let wrapped = self.wrapper.wrap(&private_der, pin, fingerprint)?;

        // 4 + 5. Stage both files, then move them into place
        if let Some(parent) = public_key_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|e| SealError::io(parent, e))?;
        }
        let staged_private = storage::stage(&private_key_path, wrapped.to_base64().as_bytes())?;
        let staged_public = storage::stage(&public_key_path, encode_base64(&public_der).as_bytes())?;
        staged_private.commit()?;
        staged_public.commit()?;

        info!(
            volume = %volume.mount_point.display(),
            fingerprint = %fingerprint,
            bits = self.key_bits,
            "Provisioned new signing key pair"
        );

        Ok(Provisioned {
            volume_path: volume.mount_point,
            private_key_path,
            public_key_path,
            fingerprint: fingerprint.to_hex(),
        })
    }
}
