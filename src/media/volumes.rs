//! Mounted volume enumeration.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sysinfo::Disks;
use tracing::trace;

/// A mounted storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub mount_point: PathBuf,
    pub filesystem: String,
    /// Reported as removable by the OS (or configured as such)
    pub is_removable: bool,
}

impl Volume {
    /// A volume rooted at `mount_point`, named after it.
    pub fn at(mount_point: impl Into<PathBuf>, is_removable: bool) -> Self {
        let mount_point = mount_point.into();
        Self {
            name: mount_point.to_string_lossy().to_string(),
            mount_point,
            filesystem: "unknown".to_string(),
            is_removable,
        }
    }
}

/// Source of the currently mounted volumes.
///
/// Implemented over the OS in [`SysinfoVolumes`] and over a fixed list in
/// [`StaticVolumes`] so discovery can be exercised without hardware.
pub trait VolumeSource: Send + Sync {
    fn volumes(&self) -> Vec<Volume>;
}

/// Volumes reported by the OS, plus any configured extra roots.
#[derive(Debug, Clone, Default)]
pub struct SysinfoVolumes {
    extra_roots: Vec<PathBuf>,
}

impl SysinfoVolumes {
    pub fn new(extra_roots: Vec<PathBuf>) -> Self {
        Self { extra_roots }
    }
}

impl VolumeSource for SysinfoVolumes {
    fn volumes(&self) -> Vec<Volume> {
        let disks = Disks::new_with_refreshed_list();

        let mounted = disks.list().iter().map(|d| Volume {
            name: d.name().to_string_lossy().to_string(),
            mount_point: d.mount_point().to_path_buf(),
            filesystem: d.file_system().to_string_lossy().to_string(),
            is_removable: d.is_removable(),
        });
        let extra = self
            .extra_roots
            .iter()
            .map(|root| Volume::at(root.clone(), true));

        let volumes = dedup_by_mount_point(mounted.chain(extra));
        trace!(count = volumes.len(), "Enumerated volumes");
        volumes
    }
}

/// A fixed volume list.
#[derive(Debug, Clone, Default)]
pub struct StaticVolumes(pub Vec<Volume>);

impl VolumeSource for StaticVolumes {
    fn volumes(&self) -> Vec<Volume> {
        self.0.clone()
    }
}

fn dedup_by_mount_point(volumes: impl Iterator<Item = Volume>) -> Vec<Volume> {
    let mut seen = HashSet::new();
    volumes
        .filter(|v| seen.insert(v.mount_point.clone()))
        .collect()
}
