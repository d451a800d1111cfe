use std::fs::{self, File};
use std::io::BufReader;
use chrono::{DateTime, Utc};
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{SegmentId, SegmentMeta};

/// List of committed segments. Replacing this file publishes a commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: u32,
    pub segments: Vec<SegmentMeta>,
    pub next_segment_id: SegmentId,
    pub timestamp: DateTime<Utc>,
}

impl Default for Manifest {
    fn default() -> Self {
        Manifest {
            version: Self::VERSION,
            segments: Vec::new(),
            next_segment_id: SegmentId(0),
            timestamp: Utc::now(),
        }
    }
}

impl Manifest {
    pub const VERSION: u32 = 1;

    /// Load manifest from disk; a fresh index has none yet
    pub fn load(storage: &StorageLayout) -> Result<Self> {
        let path = storage.manifest_path();
        if !path.exists() {
            return Ok(Manifest::default());
        }

        let data = fs::read(path)?;
        let manifest: Manifest = bincode::deserialize(&data)
            .map_err(|e| Error::corrupted(format!("unreadable manifest: {}", e)))?;
        if manifest.version != Self::VERSION {
            return Err(Error::corrupted(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let data = bincode::serialize(self)?;
        storage.write_atomic(&storage.manifest_path(), &data)
    }

    pub fn allocate_segment_id(&mut self) -> SegmentId {
        let id = self.next_segment_id;
        self.next_segment_id = id.next();
        id
    }

    /// Copy with `removed` segments replaced by `added`
    pub fn with_segments(&self, removed: &[SegmentId], added: Option<SegmentMeta>) -> Manifest {
        let mut segments: Vec<SegmentMeta> = self.segments.iter()
            .filter(|s| !removed.contains(&s.id))
            .cloned()
            .collect();
        segments.extend(added);

        Manifest {
            version: Self::VERSION,
            segments,
            next_segment_id: self.next_segment_id,
            timestamp: Utc::now(),
        }
    }
}

/// Deleted row ids, stored beside the segments
pub struct TombstoneFile;

impl TombstoneFile {
    pub fn load(storage: &StorageLayout) -> Result<RoaringTreemap> {
        let path = storage.tombstones_path();
        if !path.exists() {
            return Ok(RoaringTreemap::new());
        }

        let reader = BufReader::new(File::open(path)?);
        RoaringTreemap::deserialize_from(reader)
            .map_err(|e| Error::corrupted(format!("unreadable tombstones: {}", e)))
    }

    pub fn save(storage: &StorageLayout, tombstones: &RoaringTreemap) -> Result<()> {
        let mut data = Vec::with_capacity(tombstones.serialized_size());
        tombstones.serialize_into(&mut data)?;
        storage.write_atomic(&storage.tombstones_path(), &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RowId;

    fn meta(id: u32) -> SegmentMeta {
        SegmentMeta {
            id: SegmentId(id),
            doc_count: 1,
            size_bytes: 10,
            min_row_id: Some(RowId(id as u64)),
            max_row_id: Some(RowId(id as u64)),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_manifest_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();

        let mut manifest = Manifest::load(&storage).unwrap();
        assert!(manifest.segments.is_empty());
        let id = manifest.allocate_segment_id();
        let manifest = manifest.with_segments(&[], Some(meta(id.0)));
        manifest.save(&storage).unwrap();

        let loaded = Manifest::load(&storage).unwrap();
        assert_eq!(loaded.segments.len(), 1);
        assert_eq!(loaded.next_segment_id, SegmentId(1));
    }

    #[test]
    fn test_with_segments_replaces() {
        let manifest = Manifest::default()
            .with_segments(&[], Some(meta(0)))
            .with_segments(&[], Some(meta(1)))
            .with_segments(&[SegmentId(0), SegmentId(1)], Some(meta(2)));
        let ids: Vec<_> = manifest.segments.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SegmentId(2)]);
    }

    #[test]
    fn test_tombstones_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        assert!(TombstoneFile::load(&storage).unwrap().is_empty());

        let mut deleted = RoaringTreemap::new();
        deleted.insert(3);
        deleted.insert(u64::MAX - 1);
        TombstoneFile::save(&storage, &deleted).unwrap();
        assert_eq!(TombstoneFile::load(&storage).unwrap(), deleted);
    }
}
