//! Error types for key custody, signing and verification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every failure the core can report.
///
/// All of these are expected, recoverable conditions: the caller fixes the
/// input (inserts the medium, re-enters the PIN, picks another file) and
/// tries again. Nothing is retried automatically.
#[derive(Error, Debug)]
pub enum SealError {
    #[error("No writable removable volume found")]
    NoRemovableMedia,

    #[error("Wrapped private key '{0}' not found on any mounted volume")]
    KeyNotFound(String),

    /// Wrong PIN and a corrupted key file are not told apart.
    #[error("Failed to unwrap private key (wrong PIN or corrupted key file)")]
    DecryptFailure,

    #[error("Invalid private key: {0}")]
    KeyParseFailure(String),

    #[error("Failed to load public key from {path}: {reason}")]
    KeyLoadFailure { path: PathBuf, reason: String },

    #[error("Signature file not found: {0}")]
    SignatureMissing(PathBuf),

    #[error("Malformed signature file {path}: {reason}")]
    SignatureMalformed { path: PathBuf, reason: String },

    #[error("Document not found: {0}")]
    DocumentMissing(PathBuf),

    #[error("A key pair already exists at {0}")]
    KeyPairExists(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Crypto error: {0}")]
    CryptoFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Serializable discriminant of [`SealError`], for UIs and tests that branch
/// on the cause rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoRemovableMedia,
    KeyNotFound,
    DecryptFailure,
    KeyParseFailure,
    KeyLoadFailure,
    SignatureMissing,
    SignatureMalformed,
    DocumentMissing,
    KeyPairExists,
    IoFailure,
    CryptoFailure,
    Config,
}

impl SealError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoRemovableMedia => ErrorKind::NoRemovableMedia,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::DecryptFailure => ErrorKind::DecryptFailure,
            Self::KeyParseFailure(_) => ErrorKind::KeyParseFailure,
            Self::KeyLoadFailure { .. } => ErrorKind::KeyLoadFailure,
            Self::SignatureMissing(_) => ErrorKind::SignatureMissing,
            Self::SignatureMalformed { .. } => ErrorKind::SignatureMalformed,
            Self::DocumentMissing(_) => ErrorKind::DocumentMissing,
            Self::KeyPairExists(_) => ErrorKind::KeyPairExists,
            Self::Io { .. } => ErrorKind::IoFailure,
            Self::CryptoFailure(_) => ErrorKind::CryptoFailure,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Operator-facing message telling them what to do next.
    ///
    /// Each kind maps to its own sentence; a UI should show this rather than
    /// collapsing failures into a generic "operation failed".
    pub fn user_message(&self) -> String {
        match self {
            Self::NoRemovableMedia => {
                "Insert a writable removable medium (USB drive) and try again.".to_string()
            }
            Self::KeyNotFound(name) => format!(
                "Insert the removable medium holding '{name}' and try again."
            ),
            Self::DecryptFailure => {
                "PIN incorrect or key file corrupted. Re-enter the PIN.".to_string()
            }
            Self::KeyParseFailure(_) => {
                "The key on the medium is damaged or was not produced by this tool. Provision a new key pair."
                    .to_string()
            }
            Self::KeyLoadFailure { path, .. } => format!(
                "The public key at {} is missing or unreadable. Provision a key pair first.",
                path.display()
            ),
            Self::SignatureMissing(path) => format!(
                "No signature found at {}. Sign the document first.",
                path.display()
            ),
            Self::SignatureMalformed { path, .. } => format!(
                "The signature at {} is damaged. Sign the document again.",
                path.display()
            ),
            Self::DocumentMissing(path) => format!(
                "Document {} does not exist. Check the path.",
                path.display()
            ),
            Self::KeyPairExists(path) => format!(
                "A key pair already exists ({}). Use --force to replace it; the old key will be lost.",
                path.display()
            ),
            Self::Io { path, source } => format!(
                "Could not read or write {}: {source}.",
                path.display()
            ),
            Self::CryptoFailure(reason) => format!("Cryptographic operation failed: {reason}."),
            Self::Config(reason) => format!("Invalid configuration: {reason}."),
        }
    }
}

/// Result type for pinseal operations
pub type Result<T> = std::result::Result<T, SealError>;
