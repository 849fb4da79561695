//! pinseal: PIN-protected document signing with the key kept on removable media
//!
//! A signing key pair is generated once. The private half is wrapped under a
//! key derived from the operator's PIN and written only to a detachable
//! volume; the public half stays on the host. Signing finds the medium,
//! unwraps the key with the PIN and writes a detached `<document>.sig`.
//! Verification needs only the host's public key.
//!
//! ## Layout
//!
//! - `crypto`: KDF, key wrapping, RSA keys, digests and signatures
//! - `media`: volume enumeration and system/external classification
//! - `storage`: atomic file writes
//! - `service`: provisioning, signing and verification pipelines
//! - `api`: serialisable request/response calls for a UI
//!
//! Everything is synchronous and each call is self-contained.

pub mod api;
pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod media;
pub mod service;
pub mod storage;

pub use api::{Custody, ErrorReport, PairingStatus, ProvisionResult, SignResult, VerifyResult};
pub use config::Config;
pub use error::{ErrorKind, Result, SealError};
pub use media::{MediaLocator, Volume, VolumeKind};
pub use service::{KeyLayout, KeyPairService, SigningService, VerificationService};
