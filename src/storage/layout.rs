use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use crate::core::error::Result;
use crate::storage::segment::SegmentId;

/// Directory structure of one index
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Root directory
    pub segments_dir: PathBuf,  // Immutable segment files (.seg)
}

impl StorageLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        let segments_dir = base_dir.join("segments");
        fs::create_dir_all(&segments_dir)?;

        Ok(StorageLayout {
            base_dir,
            segments_dir,
        })
    }

    /// Layout of an existing index; nothing is created
    pub fn existing(base_dir: PathBuf) -> Option<Self> {
        let layout = StorageLayout {
            segments_dir: base_dir.join("segments"),
            base_dir,
        };
        if layout.meta_path().exists() { Some(layout) } else { None }
    }

    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        self.segments_dir.join(format!("{:08}.seg", id.0))
    }

    pub fn meta_path(&self) -> PathBuf {
        self.base_dir.join("meta.json")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join("manifest.bin")
    }

    pub fn tombstones_path(&self) -> PathBuf {
        self.base_dir.join("tombstones.bin")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    /// Replace `path` with `data` so that readers see either the old or the
    /// new content: write a sibling temp file, fsync it, rename over.
    ///
    /// An `Err` means `path` still holds the old content. Once the rename has
    /// happened the write counts as published, and a failed directory sync is
    /// only logged.
    pub fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let tmp_path = tmp_path_for(path);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = self.sync_dir(path) {
            warn!(path = %path.display(), error = %e, "directory sync failed after rename");
        }
        Ok(())
    }

    #[cfg(unix)]
    fn sync_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            File::open(parent)?.sync_all()?;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
