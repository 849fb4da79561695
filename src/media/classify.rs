//! System vs external volume classification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::volumes::Volume;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeKind {
    /// Host system storage; never used to hold the wrapped key
    System,
    /// Detachable storage
    External,
}

/// Policy deciding which volumes belong to the host system.
pub trait VolumeClassifier: Send + Sync {
    fn classify(&self, volume: &Volume) -> VolumeKind;
}

/// Classifies by comparing mount points against the host's boot volume roots.
///
/// A volume is `System` when its mount point is one of `system_roots`, or
/// lies beneath one of them (except the filesystem root itself, under which
/// every Unix mount lives). Everything else is `External`, unless
/// `removable_only` is set, in which case volumes the OS does not report as
/// removable are `System` too.
#[derive(Debug, Clone)]
pub struct BootVolumeClassifier {
    system_roots: Vec<PathBuf>,
    removable_only: bool,
}

impl BootVolumeClassifier {
    pub fn new(system_roots: Vec<PathBuf>, removable_only: bool) -> Self {
        Self {
            system_roots,
            removable_only,
        }
    }

    /// Classifier for the running host.
    pub fn for_host(removable_only: bool) -> Self {
        Self::new(host_system_roots(), removable_only)
    }

    pub fn system_roots(&self) -> &[PathBuf] {
        &self.system_roots
    }
}

impl VolumeClassifier for BootVolumeClassifier {
    fn classify(&self, volume: &Volume) -> VolumeKind {
        if self.removable_only && !volume.is_removable {
            return VolumeKind::System;
        }

        let mount = normalize(&volume.mount_point);
        let is_system = self.system_roots.iter().any(|root| {
            let root = normalize(root);
            mount == root || (!root.is_empty() && mount.starts_with(&format!("{root}/")))
        });

        if is_system {
            VolumeKind::System
        } else {
            VolumeKind::External
        }
    }
}

/// Boot volume roots of the running host.
#[cfg(windows)]
pub fn host_system_roots() -> Vec<PathBuf> {
    let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
    vec![PathBuf::from(format!("{drive}\\"))]
}

/// Boot volume roots of the running host.
#[cfg(not(windows))]
pub fn host_system_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/"), PathBuf::from("/boot")]
}

/// Comparable form of a mount point: forward slashes, no trailing separator,
/// and upper case on Windows where drive letters are case-insensitive.
fn normalize(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    let trimmed = text.trim_end_matches('/');
    if cfg!(windows) {
        trimmed.to_uppercase()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> BootVolumeClassifier {
        BootVolumeClassifier::new(vec![PathBuf::from("/"), PathBuf::from("/boot")], false)
    }

    #[test]
    fn test_boot_roots_are_system() {
        let c = classifier();
        assert_eq!(c.classify(&Volume::at("/", false)), VolumeKind::System);
        assert_eq!(c.classify(&Volume::at("/boot", false)), VolumeKind::System);
        assert_eq!(c.classify(&Volume::at("/boot/efi", false)), VolumeKind::System);
    }

    #[test]
    fn test_other_mounts_are_external() {
        let c = classifier();
        assert_eq!(c.classify(&Volume::at("/media/usb0", true)), VolumeKind::External);
        assert_eq!(c.classify(&Volume::at("/mnt/data", false)), VolumeKind::External);
        assert_eq!(c.classify(&Volume::at("/bootstrap", false)), VolumeKind::External);
    }

    #[test]
    fn test_removable_only_requires_os_flag() {
        let c = BootVolumeClassifier::new(vec![PathBuf::from("/")], true);
        assert_eq!(c.classify(&Volume::at("/mnt/data", false)), VolumeKind::System);
        assert_eq!(c.classify(&Volume::at("/media/usb0", true)), VolumeKind::External);
    }

    #[test]
    fn test_drive_letter_roots() {
        let c = BootVolumeClassifier::new(vec![PathBuf::from("C:\\")], false);
        assert_eq!(c.classify(&Volume::at("C:\\", false)), VolumeKind::System);
        assert_eq!(c.classify(&Volume::at("E:\\", true)), VolumeKind::External);
    }

    #[test]
    fn test_host_roots_not_empty() {
        assert!(!BootVolumeClassifier::for_host(false).system_roots().is_empty());
    }
}
