//! Snapshot-then-swap file commits.
//!
//! Every persisted document is rendered fully in memory, written to a
//! temporary file in the target's directory, fsynced, and renamed over the
//! canonical path. Readers observe either the old file or the new one.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

/// A fully written, fsynced temporary file waiting to replace `target`.
///
/// Dropping it without calling [`StagedWrite::commit`] removes the temporary
/// file and leaves `target` untouched.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    pub fn stage(target: &Path, bytes: &[u8]) -> io::Result<Self> {
        let dir = parent_dir(target);
        fs::create_dir_all(&dir)?;

        let prefix = format!(
            ".{}.",
            target.file_name().and_then(|n| n.to_str()).unwrap_or("staged")
        );
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(&dir)?;

        temp.write_all(bytes)?;
        temp.flush()?;
        temp.as_file().sync_all()?;

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Atomically rename the staged file over the target.
    pub fn commit(self) -> io::Result<()> {
        let dir = parent_dir(&self.target);
        self.temp.persist(&self.target).map_err(|e| e.error)?;
        sync_dir(&dir);
        Ok(())
    }
}

pub fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    StagedWrite::stage(target, bytes)?.commit()
}

pub fn write_json_atomic<T: Serialize>(target: &Path, value: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    write_atomic(target, &bytes)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

// Persists the rename itself. Not all platforms allow opening a directory.
fn sync_dir(dir: &Path) {
    if cfg!(unix) {
        if let Ok(d) = File::open(dir) {
            let _ = d.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("doc.json");

        write_atomic(&target, b"{\"a\":1}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_commit_replaces_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.txt");
        fs::write(&target, "old").unwrap();

        write_atomic(&target, b"new").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_dropped_stage_leaves_target_and_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("doc.txt");
        fs::write(&target, "original").unwrap();

        let staged = StagedWrite::stage(&target, b"half-finished").unwrap();
        let temp_path = staged.temp_path().to_path_buf();
        assert!(temp_path.exists());
        assert_eq!(temp_path.parent(), target.parent());
        drop(staged);

        assert_eq!(fs::read_to_string(&target).unwrap(), "original");
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_write_json_atomic_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("v.json");

        write_json_atomic(&target, &serde_json::json!({"k": [1, 2]})).unwrap();

        let back: serde_json::Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(back["k"][1], 2);
    }
}
