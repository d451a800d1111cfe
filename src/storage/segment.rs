use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::core::types::RowId;
use crate::index::inverted::SegmentIndex;

/// Sequential segment identifier, assigned at commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u32);

impl SegmentId {
    pub fn next(&self) -> SegmentId {
        SegmentId(self.0 + 1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub id: SegmentId,
    pub doc_count: u32,
    pub size_bytes: u64,
    pub min_row_id: Option<RowId>,
    pub max_row_id: Option<RowId>,
    pub created_at: DateTime<Utc>,
}

/// Segment file header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,     // Format version
    pub doc_count: u32,   // Number of documents
    pub checksum: u32,    // CRC32 of the payload
    pub payload_len: u64,
}

impl SegmentHeader {
    pub const VERSION: u32 = 1;
    pub const SIZE: usize = 20; // Fixed header size

    pub fn new(doc_count: u32, payload: &[u8]) -> Self {
        SegmentHeader {
            version: Self::VERSION,
            doc_count,
            checksum: crc32fast::hash(payload),
            payload_len: payload.len() as u64,
        }
    }
}

/// A committed segment loaded for querying
pub struct Segment {
    pub meta: SegmentMeta,
    pub index: SegmentIndex,
}

impl Segment {
    pub fn id(&self) -> SegmentId {
        self.meta.id
    }

    pub fn doc_count(&self) -> usize {
        self.index.doc_count()
    }
}
