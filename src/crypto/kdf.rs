//! PIN-based key derivation.
//!
//! The wrapping key is derived with Argon2id from the operator's PIN and a
//! random per-key salt. The salt and cost parameters are stored next to the
//! wrapped key, so the same PIN re-derives the same key in a later session
//! without any secret being stored.
//!
//! # Parameters
//!
//! Defaults:
//! - 64 MB memory
//! - 3 iterations
//! - 4 parallelism lanes

use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Result, SealError};

// =============================================================================
// Constants
// =============================================================================

/// Argon2id memory cost in KiB (64 MB)
pub const ARGON2_MEMORY_KB: u32 = 65536;

/// Argon2id iteration count
pub const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id parallelism (lanes)
pub const ARGON2_PARALLELISM: u32 = 4;

/// Upper bound on memory cost accepted from a key file (1 GiB)
pub const MAX_MEMORY_KB: u32 = 1024 * 1024;

/// Upper bound on iterations accepted from a key file
pub const MAX_ITERATIONS: u32 = 16;

/// Upper bound on lanes accepted from a key file
pub const MAX_PARALLELISM: u32 = 16;

/// Salt length for key derivation (16 bytes)
pub const SALT_LEN: usize = 16;

/// Derived symmetric key length (32 bytes)
pub const KEY_LEN: usize = 32;

// =============================================================================
// Parameters
// =============================================================================

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,

    #[serde(default = "default_iterations")]
    pub iterations: u32,

    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

fn default_memory_kib() -> u32 { ARGON2_MEMORY_KB }
fn default_iterations() -> u32 { ARGON2_ITERATIONS }
fn default_parallelism() -> u32 { ARGON2_PARALLELISM }

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_kib: ARGON2_MEMORY_KB,
            iterations: ARGON2_ITERATIONS,
            parallelism: ARGON2_PARALLELISM,
        }
    }
}

impl KdfParams {
    /// Check the parameters are accepted by Argon2 and within our cost caps.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.memory_kib > MAX_MEMORY_KB {
            return Err(format!(
                "memory cost {} KiB exceeds limit of {} KiB",
                self.memory_kib, MAX_MEMORY_KB
            ));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(format!(
                "iteration count {} exceeds limit of {}",
                self.iterations, MAX_ITERATIONS
            ));
        }
        if self.parallelism > MAX_PARALLELISM {
            return Err(format!(
                "parallelism {} exceeds limit of {}",
                self.parallelism, MAX_PARALLELISM
            ));
        }
        self.argon2_params().map(|_| ())
    }

    fn argon2_params(&self) -> std::result::Result<Params, String> {
        Params::new(
            self.memory_kib,
            self.iterations,
            self.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|e| format!("invalid Argon2 params: {e}"))
    }
}

// =============================================================================
// Derivation
// =============================================================================

/// Generate cryptographically secure random bytes.
pub fn generate_random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Derive the 256-bit wrapping key from a PIN.
///
/// # Arguments
///
/// - `pin`: Operator PIN (UTF-8 bytes)
/// - `salt`: Salt stored alongside the wrapped key
/// - `params`: Argon2id cost parameters stored alongside the wrapped key
///
/// Same inputs always give the same key. The result is zeroized on drop.
pub fn derive_key(
    pin: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let argon2_params = params.argon2_params().map_err(SealError::CryptoFailure)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(pin, salt, &mut *key)
        .map_err(|e| SealError::CryptoFailure(format!("Key derivation failed: {e}")))?;

    Ok(key)
}
