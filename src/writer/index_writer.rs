use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use rayon::prelude::*;
use roaring::RoaringTreemap;
use tracing::{debug, info, warn};
use crate::analysis::tokenizer::Token;
use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::core::types::{Document, RowId, MAX_ROW_ID};
use crate::index::inverted::{InvertedIndex, SegmentIndex};
use crate::mvcc::controller::MVCCController;
use crate::schema::schema::SchemaWithAnalyzer;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{Manifest, TombstoneFile};
use crate::storage::merge_policy::{MergePolicy, TieredMergePolicy};
use crate::storage::segment::{Segment, SegmentId};
use crate::storage::segment_writer::SegmentWriter;

/// Batches larger than this are analyzed on the rayon pool
const PARALLEL_ANALYZE_THRESHOLD: usize = 100;

/// Single writer of one index.
///
/// Documents are analyzed into an in-memory segment buffer. `commit` turns
/// the buffer into an immutable segment file and publishes it by replacing
/// the manifest; nothing a reader can see changes before that rename.
pub struct IndexWriter {
    storage: Arc<StorageLayout>,
    schema: Arc<SchemaWithAnalyzer>,
    mvcc: Arc<MVCCController>,
    config: Config,
    manifest: Manifest,
    buffer: InvertedIndex,
    tombstones: RoaringTreemap,
    known_rows: RoaringTreemap, // Committed, buffered or deleted row ids
    merge_policy: Box<dyn MergePolicy>,
    _lock: FileLock,
}

impl IndexWriter {
    pub fn open(
        storage: Arc<StorageLayout>,
        schema: Arc<SchemaWithAnalyzer>,
        mvcc: Arc<MVCCController>,
        config: Config,
    ) -> Result<Self> {
        let lock = FileLock::acquire(&storage)?;
        let manifest = Manifest::load(&storage)?;
        let tombstones = TombstoneFile::load(&storage)?;

        let snapshot = mvcc.current_snapshot();
        let mut known_rows = tombstones.clone();
        for segment in &snapshot.segments {
            known_rows.extend(segment.index.row_ids.iter().map(|r| r.0));
        }

        remove_orphan_files(&storage, &manifest);

        info!(
            path = %storage.base_dir.display(),
            segments = manifest.segments.len(),
            "writer opened"
        );

        Ok(IndexWriter {
            buffer: InvertedIndex::new(schema.schema.num_fields()),
            merge_policy: Box::new(TieredMergePolicy::from_config(&config)),
            storage,
            schema,
            mvcc,
            config,
            manifest,
            tombstones,
            known_rows,
            _lock: lock,
        })
    }

    pub fn add_document(&mut self, doc: Document) -> Result<()> {
        self.add_documents(vec![doc])
    }

    /// Add a batch; if any document is rejected none of them is buffered
    pub fn add_documents(&mut self, docs: Vec<Document>) -> Result<()> {
        let mut batch_rows = HashSet::with_capacity(docs.len());
        for doc in &docs {
            self.schema.schema.validate_document(doc)?;
            if doc.row_id.0 > MAX_ROW_ID {
                return Err(Error::invalid_input(format!(
                    "row id {} is above the limit of {}",
                    doc.row_id.0, MAX_ROW_ID
                )));
            }
            if self.known_rows.contains(doc.row_id.0) || !batch_rows.insert(doc.row_id) {
                return Err(Error::invalid_input(format!(
                    "row id {} is already indexed",
                    doc.row_id.0
                )));
            }
        }

        let analyzed: Vec<(RowId, Vec<Vec<Token>>)> = if docs.len() > PARALLEL_ANALYZE_THRESHOLD {
            docs.par_iter().map(|doc| (doc.row_id, self.analyze(doc))).collect()
        } else {
            docs.iter().map(|doc| (doc.row_id, self.analyze(doc))).collect()
        };

        for (row_id, field_tokens) in analyzed {
            self.buffer.add_document(row_id, field_tokens);
            self.known_rows.insert(row_id.0);
        }

        debug!(docs = docs.len(), buffered = self.buffer.doc_count(), "documents buffered");
        Ok(())
    }

    /// Index one row given parallel name / text lists
    pub fn index_multi_column_docs(
        &mut self,
        row_id: RowId,
        column_names: &[String],
        column_docs: &[String],
    ) -> Result<()> {
        if column_names.len() != column_docs.len() {
            return Err(Error::schema(format!(
                "{} column names but {} column texts",
                column_names.len(),
                column_docs.len()
            )));
        }

        let mut doc = Document::new(row_id);
        for (name, text) in column_names.iter().zip(column_docs) {
            if doc.columns.contains_key(name) {
                return Err(Error::schema(format!("column '{}' given twice", name)));
            }
            doc.add_column(name.clone(), text.clone());
        }
        self.add_document(doc)
    }

    fn analyze(&self, doc: &Document) -> Vec<Vec<Token>> {
        self.schema.schema.columns.iter()
            .map(|column| {
                let text = doc.get_column(&column.name).unwrap_or("");
                self.schema.analyze(column.field_id, text)
            })
            .collect()
    }

    pub fn buffered_docs(&self) -> usize {
        self.buffer.doc_count()
    }

    /// Flush the buffer into a new segment and publish it.
    ///
    /// Returns the new segment id, or `None` when nothing was buffered. On
    /// error the committed state is untouched and the buffer is kept.
    pub fn commit(&mut self) -> Result<Option<SegmentId>> {
        if self.buffer.is_empty() {
            debug!("commit with empty buffer");
            return Ok(None);
        }

        let stored = self.buffer.to_stored()?;
        let mut manifest = self.manifest.clone();
        let segment_id = manifest.allocate_segment_id();

        let meta = SegmentWriter::new(&self.storage, self.config.compression, self.config.sync_on_commit)
            .write(segment_id, &stored)?;
        let segment = Arc::new(Segment {
            meta: meta.clone(),
            index: SegmentIndex::from_stored(stored, self.schema.schema.num_fields())?,
        });

        let manifest = manifest.with_segments(&[], Some(meta));
        // A failed save leaves the previous manifest in place
        if let Err(e) = manifest.save(&self.storage) {
            warn!(segment = segment_id.0, error = %e, "commit failed, segment discarded");
            let _ = fs::remove_file(self.storage.segment_path(segment_id));
            return Err(e);
        }
        self.manifest = manifest;

        let docs = self.buffer.doc_count();
        self.buffer.clear();
        self.mvcc.publish(|current| {
            let mut segments = current.segments.clone();
            segments.push(segment);
            (segments, current.deleted_rows.clone())
        });

        info!(segment = segment_id.0, docs, "committed segment");
        Ok(Some(segment_id))
    }

    /// Tombstone rows. Unknown ids are accepted; repeated deletes are no-ops.
    pub fn delete_rows(&mut self, row_ids: &[u64]) -> Result<()> {
        let mut tombstones = self.tombstones.clone();
        let mut added = 0;
        for &row_id in row_ids {
            if tombstones.insert(row_id) {
                added += 1;
            }
        }
        if added == 0 {
            return Ok(());
        }

        TombstoneFile::save(&self.storage, &tombstones)?;
        self.known_rows |= &tombstones;
        self.tombstones = tombstones.clone();
        self.mvcc.publish_deletes(tombstones);

        info!(rows = added, total = self.tombstones.len(), "rows deleted");
        Ok(())
    }

    /// Rewrite the segments chosen by the merge policy into one, dropping
    /// tombstoned rows. Returns whether anything was merged.
    ///
    /// Dropped rows no longer count towards `total_num_docs`, so BM25 scores
    /// computed from local statistics shift after a merge, and the universe
    /// shrinks when the largest row id was deleted. Tombstones are kept, so
    /// the dropped ids are still never reused.
    pub fn merge_segments(&mut self) -> Result<bool> {
        if !self.should_merge() {
            return Ok(false);
        }
        let selected = self.merge_policy.select_segments_to_merge(&self.manifest.segments);
        if selected.is_empty() {
            return Ok(false);
        }
        let removed: Vec<SegmentId> = selected.iter().map(|s| s.id).collect();

        let snapshot = self.mvcc.current_snapshot();
        let mut merged = InvertedIndex::new(self.schema.schema.num_fields());
        for id in &removed {
            let segment = snapshot.segments.iter()
                .find(|s| s.id() == *id)
                .ok_or_else(|| Error::internal(format!("segment {} is not loaded", id.0)))?;
            merged.append_segment(&segment.index, &snapshot.deleted_rows);
        }

        let mut manifest = self.manifest.clone();
        let new_segment = if merged.is_empty() {
            None
        } else {
            let stored = merged.to_stored()?;
            let segment_id = manifest.allocate_segment_id();
            let meta = SegmentWriter::new(&self.storage, self.config.compression, self.config.sync_on_commit)
                .write(segment_id, &stored)?;
            Some(Arc::new(Segment {
                meta,
                index: SegmentIndex::from_stored(stored, self.schema.schema.num_fields())?,
            }))
        };

        let manifest = manifest.with_segments(&removed, new_segment.as_ref().map(|s| s.meta.clone()));
        if let Err(e) = manifest.save(&self.storage) {
            if let Some(segment) = &new_segment {
                let _ = fs::remove_file(self.storage.segment_path(segment.id()));
            }
            return Err(e);
        }
        self.manifest = manifest;

        self.mvcc.publish(|current| {
            let mut segments: Vec<Arc<Segment>> = current.segments.iter()
                .filter(|s| !removed.contains(&s.id()))
                .cloned()
                .collect();
            segments.extend(new_segment.clone());
            (segments, current.deleted_rows.clone())
        });

        // Pinned readers hold the merged segments in memory
        for id in &removed {
            if let Err(e) = fs::remove_file(self.storage.segment_path(*id)) {
                warn!(segment = id.0, error = %e, "failed to remove merged segment");
            }
        }

        info!(
            merged = removed.len(),
            docs = new_segment.as_ref().map(|s| s.doc_count()).unwrap_or(0),
            "segments merged"
        );
        Ok(true)
    }

    pub fn should_merge(&self) -> bool {
        self.merge_policy.should_merge(&self.manifest.segments)
    }
}

/// Drop segment files left behind by commits that never reached the manifest
fn remove_orphan_files(storage: &StorageLayout, manifest: &Manifest) {
    let Ok(entries) = fs::read_dir(&storage.segments_dir) else {
        return;
    };
    let live: HashSet<_> = manifest.segments.iter()
        .map(|s| storage.segment_path(s.id))
        .collect();

    for entry in entries.flatten() {
        let path = entry.path();
        if !live.contains(&path) {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed orphan segment file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove orphan file"),
            }
        }
    }
}
