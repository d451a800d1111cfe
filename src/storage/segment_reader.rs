use std::fs::File;
use std::sync::Arc;
use memmap2::Mmap;
use crate::compression::compress::CompressedBlock;
use crate::core::error::{Error, Result};
use crate::index::inverted::{SegmentIndex, StoredSegment};
use crate::storage::layout::StorageLayout;
use crate::storage::segment::{Segment, SegmentHeader, SegmentMeta};

pub struct SegmentReader;

impl SegmentReader {
    /// Map a segment file, verify it and rebuild its inverted index
    pub fn open(storage: &StorageLayout, meta: SegmentMeta, num_fields: usize) -> Result<Segment> {
        let path = storage.segment_path(meta.id);
        let file = File::open(&path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SegmentHeader::SIZE {
            return Err(Error::corrupted(format!("segment {} is truncated", meta.id.0)));
        }
        let header: SegmentHeader = bincode::deserialize(&mmap[..SegmentHeader::SIZE])?;

        // Verify version
        if header.version != SegmentHeader::VERSION {
            return Err(Error::corrupted(format!(
                "segment {} has incompatible version {}",
                meta.id.0, header.version
            )));
        }

        let payload = &mmap[SegmentHeader::SIZE..];
        if payload.len() as u64 != header.payload_len {
            return Err(Error::corrupted(format!("segment {} is truncated", meta.id.0)));
        }
        if crc32fast::hash(payload) != header.checksum {
            return Err(Error::corrupted(format!("segment {} failed checksum", meta.id.0)));
        }

        let block: CompressedBlock = bincode::deserialize(payload)?;
        let stored: StoredSegment = bincode::deserialize(&block.decompress()?)?;
        if stored.row_ids.len() != header.doc_count as usize {
            return Err(Error::corrupted(format!("segment {} doc count mismatch", meta.id.0)));
        }

        let index = SegmentIndex::from_stored(stored, num_fields)?;
        Ok(Segment { meta, index })
    }

    /// Open every listed segment, reusing already loaded ones by id
    pub fn open_all(
        storage: &StorageLayout,
        metas: &[SegmentMeta],
        num_fields: usize,
        loaded: &[Arc<Segment>],
    ) -> Result<Vec<Arc<Segment>>> {
        metas.iter()
            .map(|meta| match loaded.iter().find(|s| s.id() == meta.id) {
                Some(segment) => Ok(segment.clone()),
                None => Self::open(storage, meta.clone(), num_fields).map(Arc::new),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use crate::analysis::tokenizer::Token;
    use crate::compression::compress::CompressionType;
    use crate::core::error::ErrorKind;
    use crate::core::types::{FieldId, RowId};
    use crate::index::inverted::InvertedIndex;
    use crate::storage::segment::SegmentId;
    use crate::storage::segment_writer::SegmentWriter;

    fn stored() -> StoredSegment {
        let mut index = InvertedIndex::new(1);
        let tokens = vec![
            Token::new("hello".to_string(), 0, 0),
            Token::new("world".to_string(), 1, 6),
        ];
        index.add_document(RowId(5), vec![tokens]);
        index.to_stored().unwrap()
    }

    #[test]
    fn test_write_then_open() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        for compression in [CompressionType::None, CompressionType::LZ4, CompressionType::Zstd, CompressionType::Snappy] {
            let meta = SegmentWriter::new(&storage, compression, false)
                .write(SegmentId(1), &stored())
                .unwrap();
            assert_eq!(meta.doc_count, 1);
            assert_eq!(meta.max_row_id, Some(RowId(5)));

            let segment = SegmentReader::open(&storage, meta, 1).unwrap();
            let field = segment.index.field(FieldId(0)).unwrap();
            assert!(field.term("world").is_some());
            assert_eq!(segment.index.row_id(0), RowId(5));
        }
    }

    #[test]
    fn test_flipped_byte_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageLayout::new(dir.path().to_path_buf()).unwrap();
        let meta = SegmentWriter::new(&storage, CompressionType::None, false)
            .write(SegmentId(2), &stored())
            .unwrap();

        let path = storage.segment_path(SegmentId(2));
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = SegmentReader::open(&storage, meta, 1).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Corrupted);
    }
}
