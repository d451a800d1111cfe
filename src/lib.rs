pub mod core;
pub mod storage;
pub mod analysis;
pub mod schema;
pub mod index;
pub mod scoring;
pub mod search;
pub mod query;
pub mod mvcc;
pub mod writer;
pub mod reader;
pub mod compression;
pub mod api;

pub use crate::core::config::{Config, IndexParameter};
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::index::IndexHandle;
pub use crate::core::stats::{DocWithFreq, FieldTokenNums, IndexStats, Statistics};
pub use crate::core::types::{Document, RowId};
pub use crate::query::ast::Query;
pub use crate::search::bitmap::AliveFilter;
pub use crate::search::executor::Bm25Request;
pub use crate::search::results::RowIdWithScore;

/*
┌──────────────────────────────── ROWSEARCH ARCHITECTURE ────────────────────────────────┐
│                                                                                         │
│  struct IndexHandle (caller owned, one per index directory)                             │
│  ├─ storage: Arc<StorageLayout>          .lock  meta.json  manifest.bin                 │
│  │                                        tombstones.bin  segments/<id>.seg             │
│  ├─ schema: Arc<SchemaWithAnalyzer>      columns + one Analyzer per column              │
│  ├─ mvcc: Arc<MVCCController>            RwLock<Arc<Snapshot>>                          │
│  ├─ writer: Mutex<Option<IndexWriter>>                                                  │
│  │    ├─ buffer: InvertedIndex           per-field BTreeMap<term, PostingList>          │
│  │    ├─ manifest: Manifest              committed SegmentMeta list                     │
│  │    ├─ tombstones: RoaringTreemap                                                     │
│  │    └─ _lock: FileLock                 flock, one writer per directory                │
│  └─ reader: RwLock<Option<Arc<IndexReader>>>                                            │
│       └─ snapshot: Arc<Snapshot>         segments + deleted_rows, pinned                │
│                                                                                         │
│  WRITE:  Document ─► Analyzer ─► InvertedIndex ─commit─► SegmentWriter ─► .seg          │
│                                                   └─► Manifest::save (publishes)        │
│  DELETE: row ids ─► TombstoneFile::save ─► MVCCController::publish_deletes              │
│  READ:   Query ─► QueryEvaluator ─► RoaringTreemap − tombstones ─► bitmap::encode       │
│          Bm25Request ─► Bm25Searcher (rayon per segment) ─► TopKCollector               │
│                                                                                         │
│  Segment file: [SegmentHeader: version doc_count crc32 payload_len]                     │
│                [bincode(CompressedBlock(bincode(StoredSegment)))]                       │
│  StoredSegment: per field { fst term dict, postings by ordinal, doc lengths }, row_ids  │
└─────────────────────────────────────────────────────────────────────────────────────────┘
*/
