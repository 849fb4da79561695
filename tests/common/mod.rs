//! Shared fixtures: a fake host with a system volume and a USB stick.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use pinseal::crypto::KdfParams;
use pinseal::media::{BootVolumeClassifier, StaticVolumes};
use pinseal::{Config, Custody, MediaLocator, Volume};
use tempfile::TempDir;

pub struct Host {
    pub dir: TempDir,
    pub system: PathBuf,
    pub usb: PathBuf,
    pub home: PathBuf,
}

impl Host {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let system = dir.path().join("system");
        let usb = dir.path().join("usb");
        let home = dir.path().join("home");
        for d in [&system, &usb, &home] {
            fs::create_dir_all(d).unwrap();
        }
        Self {
            dir,
            system,
            usb,
            home,
        }
    }

    /// Fast settings: 2048-bit keys, cheap Argon2, public key in `home`.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.keys.key_bits = 2048;
        config.keys.public_key_path = self.home.join("public_key.pem");
        config.kdf = KdfParams {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        };
        config
    }

    /// Custody with the USB stick plugged in.
    pub fn custody(&self) -> Custody {
        self.custody_with(true)
    }

    /// Custody with only the system volume mounted.
    pub fn custody_without_usb(&self) -> Custody {
        self.custody_with(false)
    }

    /// Custody with the USB stick plugged in and a non-default key size.
    pub fn custody_with_key_bits(&self, key_bits: usize) -> Custody {
        let mut config = self.config();
        config.keys.key_bits = key_bits;
        Custody::new(self.locator(true), &config)
    }

    fn custody_with(&self, usb: bool) -> Custody {
        Custody::new(self.locator(usb), &self.config())
    }

    fn locator(&self, usb: bool) -> MediaLocator {
        let mut volumes = vec![Volume::at(&self.system, false)];
        if usb {
            volumes.push(Volume::at(&self.usb, true));
        }
        MediaLocator::new(
            StaticVolumes(volumes),
            BootVolumeClassifier::new(vec![self.system.clone()], false),
        )
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.home.join("public_key.pem")
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.usb.join("private_key.enc")
    }

    pub fn write_document(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.home.join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

pub fn signature_path(document: &Path) -> PathBuf {
    let mut name = document.as_os_str().to_owned();
    name.push(".sig");
    PathBuf::from(name)
}

pub fn dir_is_empty(dir: &Path) -> bool {
    fs::read_dir(dir).unwrap().next().is_none()
}
