//! PIN-based wrapping of private key material.
//!
//! The private key is encrypted with ChaCha20-Poly1305 under a key derived
//! from the operator's PIN (see [`super::kdf`]). The envelope header is bound
//! as associated data, so a wrong PIN, a flipped ciphertext bit, or an edited
//! header all fail the tag check instead of yielding garbage key bytes.
//!
//! # Wrapped Key Format
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ version: 1 (1 byte)                  │
//! │ memory_kib: u32 LE                   │
//! │ iterations: u32 LE                   │
//! │ parallelism: u32 LE                  │
//! │ salt: [u8; 16]                       │
//! │ nonce: [u8; 12]                      │
//! │ fingerprint: [u8; 32]                │  ← SHA-256 of the public key SPKI
//! ├──────────────────────────────────────┤
//! │ ciphertext || tag (len + 16)         │
//! └──────────────────────────────────────┘
//! ```
//!
//! On the removable medium the whole envelope is stored as base64 text.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use super::kdf::{derive_key, generate_random_bytes, KdfParams, SALT_LEN};
use super::keys::{KeyFingerprint, FINGERPRINT_LEN};
use crate::error::{Result, SealError};

// =============================================================================
// Constants
// =============================================================================

/// Current envelope format version
pub const WRAP_VERSION: u8 = 1;

/// Nonce length for ChaCha20-Poly1305 (12 bytes)
pub const NONCE_LEN: usize = 12;

/// ChaCha20-Poly1305 auth tag length (16 bytes)
pub const AUTH_TAG_LEN: usize = 16;

/// Header length: version + 3 params + salt + nonce + fingerprint
pub const HEADER_LEN: usize = 1 + 4 * 3 + SALT_LEN + NONCE_LEN + FINGERPRINT_LEN;

// =============================================================================
// Errors
// =============================================================================

/// Why an envelope could not be opened.
///
/// Both variants surface to callers of the services as
/// [`SealError::DecryptFailure`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnwrapError {
    /// The blob is not a well-formed envelope (bad base64, truncated, unknown
    /// version, unusable KDF parameters).
    #[error("malformed wrapped key: {0}")]
    Malformed(String),

    /// The envelope is well-formed but authentication failed: wrong PIN or
    /// tampered contents.
    #[error("wrapped key rejected (wrong PIN or tampered data)")]
    Rejected,
}

impl From<UnwrapError> for SealError {
    fn from(err: UnwrapError) -> Self {
        debug!(reason = %err, "Unwrap failed");
        SealError::DecryptFailure
    }
}

// =============================================================================
// Envelope
// =============================================================================

/// An encrypted private key plus everything needed to decrypt it with the PIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedPrivateKey {
    pub params: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub fingerprint: KeyFingerprint,
    /// Encrypted key material with the auth tag appended
    pub ciphertext: Vec<u8>,
}

impl WrappedPrivateKey {
    fn header(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_LEN);
        header.push(WRAP_VERSION);
        header.extend_from_slice(&self.params.memory_kib.to_le_bytes());
        header.extend_from_slice(&self.params.iterations.to_le_bytes());
        header.extend_from_slice(&self.params.parallelism.to_le_bytes());
        header.extend_from_slice(&self.salt);
        header.extend_from_slice(&self.nonce);
        header.extend_from_slice(self.fingerprint.as_bytes());
        header
    }

    /// Serialize as `header || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header();
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse an envelope without decrypting it.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, UnwrapError> {
        if bytes.len() < HEADER_LEN + AUTH_TAG_LEN {
            return Err(UnwrapError::Malformed(format!(
                "expected at least {} bytes, got {}",
                HEADER_LEN + AUTH_TAG_LEN,
                bytes.len()
            )));
        }

        let (header, ciphertext) = bytes.split_at(HEADER_LEN);
        let (version, rest) = header.split_at(1);
        if version[0] != WRAP_VERSION {
            return Err(UnwrapError::Malformed(format!(
                "unsupported version {}",
                version[0]
            )));
        }

        let (memory, rest) = rest.split_at(4);
        let (iterations, rest) = rest.split_at(4);
        let (parallelism, rest) = rest.split_at(4);
        let (salt, rest) = rest.split_at(SALT_LEN);
        let (nonce, fingerprint) = rest.split_at(NONCE_LEN);

        let params = KdfParams {
            memory_kib: u32::from_le_bytes(to_array(memory)?),
            iterations: u32::from_le_bytes(to_array(iterations)?),
            parallelism: u32::from_le_bytes(to_array(parallelism)?),
        };
        params.validate().map_err(UnwrapError::Malformed)?;

        Ok(Self {
            params,
            salt: to_array(salt)?,
            nonce: to_array(nonce)?,
            fingerprint: KeyFingerprint::from_bytes(to_array(fingerprint)?),
            ciphertext: ciphertext.to_vec(),
        })
    }

    /// Base64 text as stored in the key file.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    /// Parse base64 key-file text. Surrounding whitespace is ignored.
    pub fn from_base64(text: &str) -> std::result::Result<Self, UnwrapError> {
        let bytes = BASE64
            .decode(text.trim())
            .map_err(|e| UnwrapError::Malformed(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

fn to_array<const N: usize>(slice: &[u8]) -> std::result::Result<[u8; N], UnwrapError> {
    slice
        .try_into()
        .map_err(|_| UnwrapError::Malformed("truncated header".into()))
}

// =============================================================================
// Wrapper
// =============================================================================

/// Encrypts and decrypts private key material under a PIN.
///
/// Holds only the KDF cost parameters used for new envelopes; unwrapping
/// always uses the parameters recorded in the envelope.
#[derive(Debug, Clone, Default)]
pub struct KeyWrapper {
    params: KdfParams,
}

impl KeyWrapper {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Wrap `plain_key` under `pin`, recording `fingerprint` in the header.
    ///
    /// A fresh salt and nonce are drawn for every call, so wrapping the same
    /// key twice gives unrelated envelopes.
    pub fn wrap(
        &self,
        plain_key: &[u8],
        pin: &str,
        fingerprint: KeyFingerprint,
    ) -> Result<WrappedPrivateKey> {
        let mut wrapped = WrappedPrivateKey {
            params: self.params,
            salt: generate_random_bytes(),
            nonce: generate_random_bytes(),
            fingerprint,
            ciphertext: Vec::new(),
        };

        let encryption_key = derive_key(pin.as_bytes(), &wrapped.salt, &wrapped.params)?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(encryption_key.as_slice()));
        let header = wrapped.header();

        wrapped.ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&wrapped.nonce),
                Payload {
                    msg: plain_key,
                    aad: &header,
                },
            )
            .map_err(|e| SealError::CryptoFailure(format!("Encryption failed: {e}")))?;

        Ok(wrapped)
    }

    /// Recover the plaintext key material from an envelope.
    pub fn unwrap(
        &self,
        wrapped: &WrappedPrivateKey,
        pin: &str,
    ) -> std::result::Result<Zeroizing<Vec<u8>>, UnwrapError> {
        let encryption_key = derive_key(pin.as_bytes(), &wrapped.salt, &wrapped.params)
            .map_err(|e| UnwrapError::Malformed(e.to_string()))?;
        let cipher = ChaCha20Poly1305::new(Key::from_slice(encryption_key.as_slice()));
        let header = wrapped.header();

        let plaintext = cipher
            .decrypt(
                Nonce::from_slice(&wrapped.nonce),
                Payload {
                    msg: &wrapped.ciphertext,
                    aad: &header,
                },
            )
            .map_err(|_| UnwrapError::Rejected)?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Parse raw envelope bytes, then unwrap.
    pub fn unwrap_bytes(
        &self,
        bytes: &[u8],
        pin: &str,
    ) -> std::result::Result<Zeroizing<Vec<u8>>, UnwrapError> {
        let wrapped = WrappedPrivateKey::from_bytes(bytes)?;
        self.unwrap(&wrapped, pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_wrapper() -> KeyWrapper {
        KeyWrapper::new(KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        })
    }

    fn fingerprint() -> KeyFingerprint {
        KeyFingerprint::of_spki_der(b"test public key")
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let wrapper = fast_wrapper();
        let key = b"pkcs8 private key bytes".to_vec();

        let wrapped = wrapper.wrap(&key, "1234", fingerprint()).unwrap();
        assert_eq!(wrapped.ciphertext.len(), key.len() + AUTH_TAG_LEN);

        let recovered = wrapper.unwrap_bytes(&wrapped.to_bytes(), "1234").unwrap();
        assert_eq!(recovered.as_slice(), key.as_slice());
    }

    #[test]
    fn test_wrong_pin_is_rejected() {
        let wrapper = fast_wrapper();
        let wrapped = wrapper.wrap(b"secret", "1234", fingerprint()).unwrap();

        for pin in ["1235", "", "12345", "4321"] {
            assert_eq!(wrapper.unwrap(&wrapped, pin), Err(UnwrapError::Rejected));
        }
    }

    #[test]
    fn test_tampering_is_rejected() {
        let wrapper = fast_wrapper();
        let bytes = wrapper.wrap(b"secret", "1234", fingerprint()).unwrap().to_bytes();

        // Flip a salt byte, a fingerprint byte and a ciphertext byte in turn.
        for index in [14, HEADER_LEN - 1, HEADER_LEN + 2] {
            let mut tampered = bytes.clone();
            tampered[index] ^= 0x80;
            assert_eq!(
                wrapper.unwrap_bytes(&tampered, "1234"),
                Err(UnwrapError::Rejected)
            );
        }
    }

    #[test]
    fn test_structural_corruption_is_malformed() {
        let wrapper = fast_wrapper();
        let bytes = wrapper.wrap(b"secret", "1234", fingerprint()).unwrap().to_bytes();

        let truncated = &bytes[..HEADER_LEN];
        assert!(matches!(
            wrapper.unwrap_bytes(truncated, "1234"),
            Err(UnwrapError::Malformed(_))
        ));

        let mut wrong_version = bytes.clone();
        wrong_version[0] = 9;
        assert!(matches!(
            wrapper.unwrap_bytes(&wrong_version, "1234"),
            Err(UnwrapError::Malformed(_))
        ));

        assert!(matches!(
            WrappedPrivateKey::from_base64("%%% not base64 %%%"),
            Err(UnwrapError::Malformed(_))
        ));
    }

    #[test]
    fn test_excessive_kdf_cost_in_header_is_malformed() {
        let wrapper = fast_wrapper();
        let mut bytes = wrapper.wrap(b"secret", "1234", fingerprint()).unwrap().to_bytes();

        // memory_kib = 1 GiB (at the cap), iterations = u32::MAX
        bytes[1..5].copy_from_slice(&(1024u32 * 1024).to_le_bytes());
        bytes[5..9].copy_from_slice(&u32::MAX.to_le_bytes());

        assert!(matches!(
            WrappedPrivateKey::from_bytes(&bytes),
            Err(UnwrapError::Malformed(_))
        ));
        assert!(matches!(
            wrapper.unwrap_bytes(&bytes, "1234"),
            Err(UnwrapError::Malformed(_))
        ));
    }

    #[test]
    fn test_base64_form_roundtrips_and_both_failures_map_to_decrypt_failure() {
        let wrapper = fast_wrapper();
        let wrapped = wrapper.wrap(b"secret", "1234", fingerprint()).unwrap();

        let text = format!("{}\n", wrapped.to_base64());
        let parsed = WrappedPrivateKey::from_base64(&text).unwrap();
        assert_eq!(parsed, wrapped);
        assert_eq!(parsed.fingerprint, fingerprint());

        let rejected: SealError = UnwrapError::Rejected.into();
        let malformed: SealError = UnwrapError::Malformed("x".into()).into();
        assert!(matches!(rejected, SealError::DecryptFailure));
        assert!(matches!(malformed, SealError::DecryptFailure));
    }
}
