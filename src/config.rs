//! pinseal configuration
//!
//! Loaded from a TOML file; every field has a default, and a missing file
//! means "all defaults". CLI flags and environment variables are applied on
//! top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::{KdfParams, ALLOWED_KEY_BITS, DEFAULT_KEY_BITS};
use crate::error::{Result, SealError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub kdf: KdfParams,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Key file locations and key size
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Local public key file (base64 SPKI, no armour)
    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// File name of the wrapped private key at a volume root
    #[serde(default = "default_private_key_file")]
    pub private_key_file: String,

    /// Appended to a document path to name its detached signature
    #[serde(default = "default_signature_suffix")]
    pub signature_suffix: String,

    /// RSA modulus size for new key pairs
    #[serde(default = "default_key_bits")]
    pub key_bits: usize,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            public_key_path: default_public_key_path(),
            private_key_file: default_private_key_file(),
            signature_suffix: default_signature_suffix(),
            key_bits: default_key_bits(),
        }
    }
}

/// Volume discovery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Mount points of the host system; empty means detect
    #[serde(default)]
    pub system_roots: Vec<PathBuf>,

    /// Additional roots to treat as removable media
    #[serde(default)]
    pub extra_roots: Vec<PathBuf>,

    /// Only volumes the OS flags as removable count as external
    #[serde(default)]
    pub removable_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Defaults
fn default_public_key_path() -> PathBuf { PathBuf::from("public_key.pem") }
fn default_private_key_file() -> String { "private_key.enc".to_string() }
fn default_signature_suffix() -> String { ".sig".to_string() }
fn default_key_bits() -> usize { DEFAULT_KEY_BITS }
fn default_log_level() -> String { "info".to_string() }

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| SealError::io(path, e))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| SealError::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_KEY_BITS.contains(&self.keys.key_bits) {
            return Err(SealError::Config(format!(
                "keys.key_bits must be one of {:?}, got {}",
                ALLOWED_KEY_BITS, self.keys.key_bits
            )));
        }
        if self.keys.private_key_file.is_empty()
            || self.keys.private_key_file.contains(['/', '\\'])
        {
            return Err(SealError::Config(
                "keys.private_key_file must be a plain file name".into(),
            ));
        }
        if self.keys.signature_suffix.is_empty() {
            return Err(SealError::Config("keys.signature_suffix must not be empty".into()));
        }
        if self.keys.public_key_path.as_os_str().is_empty() {
            return Err(SealError::Config("keys.public_key_path must not be empty".into()));
        }
        self.kdf
            .validate()
            .map_err(|e| SealError::Config(format!("kdf: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.keys.public_key_path, PathBuf::from("public_key.pem"));
        assert_eq!(config.keys.private_key_file, "private_key.enc");
        assert_eq!(config.keys.signature_suffix, ".sig");
        assert_eq!(config.keys.key_bits, 4096);
        assert_eq!(config.kdf, KdfParams::default());
        assert!(config.media.system_roots.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[keys]
key_bits = 2048

[media]
extra_roots = ["/media/usb"]
"#,
        )
        .unwrap();

        assert_eq!(config.keys.key_bits, 2048);
        assert_eq!(config.keys.private_key_file, "private_key.enc");
        assert_eq!(config.media.extra_roots, vec![PathBuf::from("/media/usb")]);
        assert_eq!(config.kdf.memory_kib, 65536);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(&dir.path().join("pinseal.toml")).unwrap();
        assert_eq!(config.keys.key_bits, DEFAULT_KEY_BITS);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pinseal.toml");
        std::fs::write(&path, "[keys\nkey_bits = ").unwrap();

        assert!(matches!(Config::load(&path), Err(SealError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.keys.key_bits = 1024;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.keys.private_key_file = "keys/private_key.enc".into();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.kdf.parallelism = 0;
        assert!(config.validate().is_err());
    }
}
