//! File persistence helpers.
//!
//! All writes are staged into a temporary file in the target's directory,
//! flushed to disk, and then renamed over the target. A reader sees either
//! the old file or the complete new one, never a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tempfile::NamedTempFile;

use crate::error::{Result, SealError};

/// A fully written file waiting to be moved into place.
#[derive(Debug)]
pub struct StagedFile {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically replace the target with the staged contents.
    pub fn commit(self) -> Result<PathBuf> {
        let StagedFile { temp, target } = self;
        temp.persist(&target)
            .map_err(|e| SealError::io(&target, e.error))?;
        Ok(target)
    }
}

/// Write `contents` next to `target` without touching `target` yet.
///
/// Dropping the returned [`StagedFile`] without committing removes the
/// temporary file.
pub fn stage(target: impl AsRef<Path>, contents: &[u8]) -> Result<StagedFile> {
    let target = target.as_ref().to_path_buf();
    let dir = parent_dir(&target);

    let mut temp = tempfile::Builder::new()
        .prefix(".pinseal-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| SealError::io(&target, e))?;

    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| SealError::io(&target, e))?;

    Ok(StagedFile { temp, target })
}

/// Stage and commit in one step.
pub fn write_atomic(target: impl AsRef<Path>, contents: &[u8]) -> Result<PathBuf> {
    stage(target, contents)?.commit()
}

/// Read a whole file, reporting a missing file as `None`.
pub fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SealError::io(path, e)),
    }
}

pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode base64 text, ignoring surrounding whitespace and line breaks.
pub fn decode_base64_text(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = text.split_whitespace().collect();
    BASE64.decode(compact)
}

/// Whether a new file can be created in `dir` right now.
///
/// Creates an anonymous temporary file, which the OS removes immediately.
pub fn is_writable_dir(dir: &Path) -> bool {
    dir.is_dir() && tempfile::tempfile_in(dir).is_ok()
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
