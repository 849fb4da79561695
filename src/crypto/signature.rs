//! Detached signatures over document digests.
//!
//! Scheme: RSASSA-PKCS1-v1_5 with SHA-256, where the signed message is the
//! 32-byte [`DocumentDigest`]. The scheme is fixed and never recorded in the
//! signature file, so signer and verifier must agree on it here.

use rand::rngs::OsRng;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use super::digest::DocumentDigest;
use crate::error::{Result, SealError};

/// Sign a document digest. Consumes the key so it is dropped (and zeroized)
/// as soon as signing is done.
pub fn sign_digest(key: RsaPrivateKey, digest: &DocumentDigest) -> Result<Vec<u8>> {
    let signing_key = SigningKey::<Sha256>::new(key);
    let signature = signing_key
        .try_sign_with_rng(&mut OsRng, digest.as_bytes())
        .map_err(|e| SealError::CryptoFailure(format!("Signing failed: {e}")))?;
    Ok(signature.to_vec())
}

/// Expected signature length in bytes for a given key (the modulus size).
pub fn signature_len(key: &RsaPublicKey) -> usize {
    key.size()
}

/// Check a signature over a document digest.
///
/// Returns `false` for any signature that does not verify, including one
/// whose length is not [`signature_len`].
pub fn verify_digest(key: &RsaPublicKey, digest: &DocumentDigest, signature: &[u8]) -> bool {
    let verifying_key = VerifyingKey::<Sha256>::new(key.clone());
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    verifying_key.verify(digest.as_bytes(), &signature).is_ok()
}
