//! Cryptographic primitives for key custody and document signing.
//!
//! # Algorithms
//!
//! - **Key Pair**: RSA (4096-bit by default)
//! - **Key Derivation**: Argon2id over the PIN with a random salt
//! - **Key Wrapping**: ChaCha20-Poly1305 (authenticated encryption)
//! - **Document Digest**: SHA-256
//! - **Signature**: RSASSA-PKCS1-v1_5 with SHA-256 over the digest

pub mod digest;
pub mod kdf;
pub mod keys;
pub mod signature;
pub mod wrap;

pub use digest::{DocumentDigest, DIGEST_LEN};
pub use kdf::{derive_key, generate_random_bytes, KdfParams, KEY_LEN, SALT_LEN};
pub use keys::{
    decode_private_key, decode_public_key, encode_private_key, encode_public_key,
    generate_keypair, KeyFingerprint, ALLOWED_KEY_BITS, DEFAULT_KEY_BITS,
};
pub use signature::{sign_digest, signature_len, verify_digest};
pub use wrap::{KeyWrapper, UnwrapError, WrappedPrivateKey, NONCE_LEN};
