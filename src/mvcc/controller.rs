use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use roaring::RoaringTreemap;
use crate::core::stats::IndexStats;
use crate::core::types::RowId;
use crate::storage::segment::Segment;

/// Snapshot of the index at a point in time: committed segments plus the
/// tombstones that applied when it was published
#[derive(Clone)]
pub struct Snapshot {
    pub version: u64,
    pub segments: Vec<Arc<Segment>>,
    pub timestamp: DateTime<Utc>,
    pub deleted_rows: Arc<RoaringTreemap>,
}

impl Snapshot {
    pub fn doc_count(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count() as u64).sum()
    }

    /// Documents not hidden by a tombstone
    pub fn live_doc_count(&self) -> u64 {
        self.segments.iter()
            .map(|segment| {
                segment.index.row_ids.iter()
                    .filter(|row| !self.deleted_rows.contains(row.0))
                    .count() as u64
            })
            .sum()
    }

    pub fn max_row_id(&self) -> Option<RowId> {
        self.segments.iter().filter_map(|s| s.meta.max_row_id).max()
    }

    /// Size of the row ordinal space that result bitmaps are encoded against
    pub fn universe(&self) -> u64 {
        self.max_row_id().map(|r| r.0.saturating_add(1)).unwrap_or(0)
    }

    pub fn is_deleted(&self, row_id: RowId) -> bool {
        self.deleted_rows.contains(row_id.0)
    }

    pub fn stats(&self) -> IndexStats {
        let total_documents = self.doc_count();
        IndexStats {
            segment_count: self.segments.len(),
            total_documents,
            deleted_documents: total_documents - self.live_doc_count(),
            max_row_id: self.max_row_id().map(|r| r.0),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Snapshot {
            version: 0,
            segments: Vec::new(),
            timestamp: Utc::now(),
            deleted_rows: Arc::new(RoaringTreemap::new()),
        }
    }
}

/// Publishes snapshots; readers pin one by cloning the Arc
pub struct MVCCController {
    current: RwLock<Arc<Snapshot>>,
    next_version: AtomicU64,
}

impl MVCCController {
    pub fn new(segments: Vec<Arc<Segment>>, deleted_rows: RoaringTreemap) -> Self {
        let snapshot = Snapshot {
            version: 0,
            segments,
            timestamp: Utc::now(),
            deleted_rows: Arc::new(deleted_rows),
        };
        MVCCController {
            current: RwLock::new(Arc::new(snapshot)),
            next_version: AtomicU64::new(1),
        }
    }

    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    /// Swap in a new snapshot built from the current one
    pub fn publish<F>(&self, build: F) -> Arc<Snapshot>
    where
        F: FnOnce(&Snapshot) -> (Vec<Arc<Segment>>, Arc<RoaringTreemap>),
    {
        let mut current = self.current.write();
        let (segments, deleted_rows) = build(&current);
        let snapshot = Arc::new(Snapshot {
            version: self.next_version.fetch_add(1, Ordering::SeqCst),
            segments,
            timestamp: Utc::now(),
            deleted_rows,
        });
        *current = snapshot.clone();
        snapshot
    }

    pub fn publish_deletes(&self, deleted_rows: RoaringTreemap) -> Arc<Snapshot> {
        let deleted_rows = Arc::new(deleted_rows);
        self.publish(|current| (current.segments.clone(), deleted_rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_snapshot_is_unaffected_by_publish() {
        let controller = MVCCController::new(Vec::new(), RoaringTreemap::new());
        let pinned = controller.current_snapshot();

        let mut deleted = RoaringTreemap::new();
        deleted.insert(7);
        let published = controller.publish_deletes(deleted);

        assert!(!pinned.is_deleted(RowId(7)));
        assert!(published.is_deleted(RowId(7)));
        assert!(published.version > pinned.version);
        assert!(controller.current_snapshot().is_deleted(RowId(7)));
    }

    #[test]
    fn test_empty_snapshot_universe() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.universe(), 0);
        assert_eq!(snapshot.stats().live_documents(), 0);
    }
}
