//! RSA signing key pairs and their standard encodings.
//!
//! - Private keys travel as PKCS#8 DER (only ever inside a wrapped envelope)
//! - Public keys travel as SubjectPublicKeyInfo DER
//! - A key is identified by the SHA-256 of its SPKI DER

use std::fmt;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, SealError};

/// Modulus size used when none is configured.
pub const DEFAULT_KEY_BITS: usize = 4096;

/// Modulus sizes accepted for new key pairs.
pub const ALLOWED_KEY_BITS: [usize; 3] = [2048, 3072, 4096];

/// Fingerprint length (SHA-256)
pub const FINGERPRINT_LEN: usize = 32;

/// SHA-256 of a public key's SPKI DER encoding.
///
/// Embedded in the wrapped private key so the two halves of a pair can be
/// matched without the PIN.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyFingerprint([u8; FINGERPRINT_LEN]);

impl KeyFingerprint {
    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn of_spki_der(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    pub fn of_public_key(key: &RsaPublicKey) -> Result<Self> {
        Ok(Self::of_spki_der(&encode_public_key(key)?))
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({})", self.to_hex())
    }
}

/// Generate a fresh RSA key pair from the OS random number generator.
pub fn generate_keypair(bits: usize) -> Result<(RsaPrivateKey, RsaPublicKey)> {
    if !ALLOWED_KEY_BITS.contains(&bits) {
        return Err(SealError::CryptoFailure(format!(
            "unsupported RSA key size {bits}"
        )));
    }

    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| SealError::CryptoFailure(format!("RSA key generation failed: {e}")))?;
    let public_key = private_key.to_public_key();

    Ok((private_key, public_key))
}

/// PKCS#8 DER encoding of a private key, zeroized on drop.
pub fn encode_private_key(key: &RsaPrivateKey) -> Result<Zeroizing<Vec<u8>>> {
    let document = key
        .to_pkcs8_der()
        .map_err(|e| SealError::CryptoFailure(format!("PKCS#8 encoding failed: {e}")))?;
    Ok(Zeroizing::new(document.as_bytes().to_vec()))
}

pub fn decode_private_key(der: &[u8]) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_der(der).map_err(|e| SealError::KeyParseFailure(e.to_string()))
}

/// SubjectPublicKeyInfo DER encoding of a public key.
pub fn encode_public_key(key: &RsaPublicKey) -> Result<Vec<u8>> {
    let document = key
        .to_public_key_der()
        .map_err(|e| SealError::CryptoFailure(format!("SPKI encoding failed: {e}")))?;
    Ok(document.as_bytes().to_vec())
}

/// Parse SPKI DER. The error string is left for the caller to attach a path to.
pub fn decode_public_key(der: &[u8]) -> std::result::Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_der(der).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::traits::PublicKeyParts;

    #[test]
    fn test_keypair_generation_and_encoding() {
        let (private_key, public_key) = generate_keypair(2048).unwrap();
        assert_eq!(public_key.size(), 256);

        let private_der = encode_private_key(&private_key).unwrap();
        let decoded = decode_private_key(&private_der).unwrap();
        assert_eq!(decoded.to_public_key(), public_key);

        let public_der = encode_public_key(&public_key).unwrap();
        assert_eq!(decode_public_key(&public_der).unwrap(), public_key);
    }

    #[test]
    fn test_fingerprint_identifies_key() {
        let (_, public_a) = generate_keypair(2048).unwrap();
        let (_, public_b) = generate_keypair(2048).unwrap();

        let fp_a = KeyFingerprint::of_public_key(&public_a).unwrap();
        let fp_a_again = KeyFingerprint::of_public_key(&public_a).unwrap();
        let fp_b = KeyFingerprint::of_public_key(&public_b).unwrap();

        assert_eq!(fp_a, fp_a_again);
        assert_ne!(fp_a, fp_b);
        assert_eq!(fp_a.to_hex().len(), FINGERPRINT_LEN * 2);
    }

    #[test]
    fn test_rejects_unsupported_size() {
        assert!(matches!(
            generate_keypair(1024),
            Err(SealError::CryptoFailure(_))
        ));
    }

    #[test]
    fn test_garbage_private_key_is_parse_failure() {
        assert!(matches!(
            decode_private_key(b"not a key"),
            Err(SealError::KeyParseFailure(_))
        ));
        assert!(decode_public_key(b"not a key").is_err());
    }

    #[test]
    #[ignore = "slow: 4096-bit prime generation"]
    fn test_default_size_keypair() {
        let (_, public_key) = generate_keypair(DEFAULT_KEY_BITS).unwrap();
        assert_eq!(public_key.size() * 8, DEFAULT_KEY_BITS);
    }
}
