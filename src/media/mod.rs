//! Removable medium discovery
//!
//! Finds where the wrapped private key should be written, and where it can
//! be found again later. Absence of a medium or of the key file is a normal
//! outcome (`None`), never an error.
//!
//! Both the volume list and the system/external policy are injected, so the
//! same locator runs over `sysinfo` on a real host and over a fixed list in
//! tests.

pub mod classify;
pub mod volumes;

use std::fs::File;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use classify::{host_system_roots, BootVolumeClassifier, VolumeClassifier, VolumeKind};
pub use volumes::{StaticVolumes, SysinfoVolumes, Volume, VolumeSource};

use crate::config::MediaConfig;
use crate::storage::is_writable_dir;

/// A volume together with how the locator sees it.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedVolume {
    #[serde(flatten)]
    pub volume: Volume,
    pub kind: VolumeKind,
    pub writable: bool,
}

pub struct MediaLocator {
    source: Box<dyn VolumeSource>,
    classifier: Box<dyn VolumeClassifier>,
}

impl MediaLocator {
    pub fn new(
        source: impl VolumeSource + 'static,
        classifier: impl VolumeClassifier + 'static,
    ) -> Self {
        Self {
            source: Box::new(source),
            classifier: Box::new(classifier),
        }
    }

    /// Locator over the host's mounted volumes.
    pub fn from_config(config: &MediaConfig) -> Self {
        let classifier = if config.system_roots.is_empty() {
            BootVolumeClassifier::for_host(config.removable_only)
        } else {
            BootVolumeClassifier::new(config.system_roots.clone(), config.removable_only)
        };
        Self::new(SysinfoVolumes::new(config.extra_roots.clone()), classifier)
    }

    /// Every mounted volume with its classification and writability.
    pub fn volumes(&self) -> Vec<ClassifiedVolume> {
        self.source
            .volumes()
            .into_iter()
            .map(|volume| {
                let kind = self.classifier.classify(&volume);
                let writable = is_writable_dir(&volume.mount_point);
                ClassifiedVolume {
                    volume,
                    kind,
                    writable,
                }
            })
            .collect()
    }

    /// First external volume that is currently writable.
    pub fn find_writable_external_volume(&self) -> Option<Volume> {
        let found = self
            .source
            .volumes()
            .into_iter()
            .filter(|v| self.classifier.classify(v) == VolumeKind::External)
            .find(|v| is_writable_dir(&v.mount_point));

        match &found {
            Some(volume) if !volume.is_removable => warn!(
                volume = %volume.mount_point.display(),
                "Selected external volume is not flagged removable by the OS; \
                 set media.removable_only or media.system_roots to exclude host partitions"
            ),
            Some(volume) => info!(volume = %volume.mount_point.display(), "Found writable removable volume"),
            None => debug!("No writable removable volume mounted"),
        }
        found
    }

    /// First readable `<volume root>/<name>`.
    ///
    /// Every volume is scanned, external ones before system ones.
    pub fn find_file(&self, name: &str) -> Option<PathBuf> {
        let (external, system): (Vec<_>, Vec<_>) = self
            .source
            .volumes()
            .into_iter()
            .partition(|v| self.classifier.classify(v) == VolumeKind::External);

        let found = external
            .iter()
            .chain(system.iter())
            .map(|v| v.mount_point.join(name))
            .find(|candidate| candidate.is_file() && File::open(candidate).is_ok());

        match &found {
            Some(path) => info!(path = %path.display(), "Found key file"),
            None => debug!(file = name, "Key file not found on any volume"),
        }
        found
    }
}
