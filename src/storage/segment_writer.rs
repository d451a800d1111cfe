use std::fs::{self, File};
use std::io::Write;
use chrono::Utc;
use tracing::debug;
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::error::Result;
use crate::core::types::RowId;
use crate::index::inverted::StoredSegment;
use crate::storage::layout::{tmp_path_for, StorageLayout};
use crate::storage::segment::{SegmentHeader, SegmentId, SegmentMeta};

/// Writes one immutable segment file.
///
/// Layout:
/// [ HEADER (version, doc_count, crc32, payload_len) ]
/// [ PAYLOAD: bincode(CompressedBlock(bincode(StoredSegment))) ]
///
/// The file is staged under a `.tmp` name and renamed into place, so a
/// segment file either exists complete or not at all.
pub struct SegmentWriter<'a> {
    storage: &'a StorageLayout,
    compression: CompressionType,
    sync: bool,
}

impl<'a> SegmentWriter<'a> {
    pub fn new(storage: &'a StorageLayout, compression: CompressionType, sync: bool) -> Self {
        SegmentWriter { storage, compression, sync }
    }

    pub fn write(&self, id: SegmentId, segment: &StoredSegment) -> Result<SegmentMeta> {
        let raw = bincode::serialize(segment)?;
        let block = CompressedBlock::compress(&raw, self.compression)?;
        let payload = bincode::serialize(&block)?;

        let doc_count = segment.row_ids.len() as u32;
        let header = SegmentHeader::new(doc_count, &payload);
        let header_data = bincode::serialize(&header)?;

        let path = self.storage.segment_path(id);
        let tmp_path = tmp_path_for(&path);
        let written = (|| -> Result<()> {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&header_data)?;
            file.write_all(&payload)?;
            if self.sync {
                file.sync_all()?;
            }
            fs::rename(&tmp_path, &path)?;
            Ok(())
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        let size_bytes = (header_data.len() + payload.len()) as u64;
        debug!(segment = id.0, doc_count, size_bytes, ratio = block.ratio(), codec = ?block.compression, "wrote segment");

        Ok(SegmentMeta {
            id,
            doc_count,
            size_bytes,
            min_row_id: segment.row_ids.iter().min().copied().map(RowId),
            max_row_id: segment.row_ids.iter().max().copied().map(RowId),
            created_at: Utc::now(),
        })
    }
}
