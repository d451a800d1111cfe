use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use crate::core::config::{Config, IndexParameter};
use crate::core::error::{Error, Result};
use crate::core::types::{Document, RowId};
use crate::mvcc::controller::MVCCController;
use crate::reader::snapshot_reader::IndexReader;
use crate::schema::schema::{IndexSchema, SchemaWithAnalyzer};
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{Manifest, TombstoneFile};
use crate::storage::segment::SegmentId;
use crate::storage::segment_reader::SegmentReader;
use crate::writer::index_writer::IndexWriter;

/// Caller-owned handle on one index directory.
///
/// Holds the optional writer and reader state of the index. Operations that
/// need a writer or reader fail with `ErrorKind::NotFound` when that state
/// has not been loaded or was freed.
pub struct IndexHandle {
    config: Config,
    storage: Arc<StorageLayout>,
    schema: Arc<SchemaWithAnalyzer>,
    mvcc: Arc<MVCCController>,
    writer: Mutex<Option<IndexWriter>>,
    reader: RwLock<Option<Arc<IndexReader>>>,
}

impl IndexHandle {
    /// Create an index at `path`, or reopen it when it already exists with
    /// the same schema, and load its writer.
    pub fn create(
        path: impl AsRef<Path>,
        columns: &[String],
        parameter_json: &str,
        config: Config,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let parameter = IndexParameter::parse(parameter_json)?;
        let schema = IndexSchema::new(columns, &parameter)?;

        let storage = match StorageLayout::existing(path.clone()) {
            Some(storage) => {
                let existing = IndexSchema::load(&storage)?;
                if existing.as_ref() != Some(&schema) {
                    return Err(Error::schema(format!(
                        "index at {} exists with a different schema",
                        path.display()
                    )));
                }
                debug!(path = %path.display(), "reopening existing index");
                storage
            }
            None => {
                let storage = StorageLayout::new(path.clone())?;
                schema.save(&storage)?;
                info!(path = %path.display(), columns = columns.len(), "created index");
                storage
            }
        };

        let handle = Self::build(storage, schema, config)?;
        handle.load_writer()?;
        Ok(handle)
    }

    /// Open an existing index without loading a writer
    pub fn open(path: impl AsRef<Path>, config: Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let storage = StorageLayout::existing(path.clone())
            .ok_or_else(|| Error::not_found(format!("no index at {}", path.display())))?;
        let schema = IndexSchema::load(&storage)?
            .ok_or_else(|| Error::not_found(format!("no index at {}", path.display())))?;

        Self::build(storage, schema, config)
    }

    fn build(storage: StorageLayout, schema: IndexSchema, config: Config) -> Result<Self> {
        let schema = Arc::new(SchemaWithAnalyzer::new(schema)?);
        let manifest = Manifest::load(&storage)?;
        let tombstones = TombstoneFile::load(&storage)?;
        let segments = SegmentReader::open_all(&storage, &manifest.segments, schema.schema.num_fields(), &[])?;

        info!(
            path = %storage.base_dir.display(),
            segments = segments.len(),
            deleted = tombstones.len(),
            "index opened"
        );

        Ok(IndexHandle {
            config,
            storage: Arc::new(storage),
            schema,
            mvcc: Arc::new(MVCCController::new(segments, tombstones)),
            writer: Mutex::new(None),
            reader: RwLock::new(None),
        })
    }

    pub fn path(&self) -> &PathBuf {
        &self.storage.base_dir
    }

    pub fn schema(&self) -> &SchemaWithAnalyzer {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.schema.column_names()
    }

    /// Pick up commits and deletes made through another handle
    fn refresh_from_disk(&self) -> Result<()> {
        let manifest = Manifest::load(&self.storage)?;
        let tombstones = Arc::new(TombstoneFile::load(&self.storage)?);
        let loaded = self.mvcc.current_snapshot();
        let segments = SegmentReader::open_all(
            &self.storage,
            &manifest.segments,
            self.schema.schema.num_fields(),
            &loaded.segments,
        )?;
        self.mvcc.publish(|_| (segments, tombstones));
        Ok(())
    }

    // Writer state

    pub fn load_writer(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        if writer.is_some() {
            return Ok(());
        }

        self.refresh_from_disk()?;
        *writer = Some(IndexWriter::open(
            self.storage.clone(),
            self.schema.clone(),
            self.mvcc.clone(),
            self.config.clone(),
        )?);
        Ok(())
    }

    /// Drop the writer, discarding uncommitted documents
    pub fn free_writer(&self) -> Result<()> {
        match self.writer.lock().take() {
            Some(writer) => {
                info!(path = %self.storage.base_dir.display(), discarded = writer.buffered_docs(), "writer freed");
                Ok(())
            }
            None => Err(no_writer(&self.storage)),
        }
    }

    pub fn has_writer(&self) -> bool {
        self.writer.lock().is_some()
    }

    fn with_writer<T>(&self, f: impl FnOnce(&mut IndexWriter) -> Result<T>) -> Result<T> {
        let mut writer = self.writer.lock();
        match writer.as_mut() {
            Some(writer) => f(writer),
            None => Err(no_writer(&self.storage)),
        }
    }

    pub fn add_document(&self, doc: Document) -> Result<()> {
        self.with_writer(|w| w.add_document(doc))
    }

    pub fn add_documents(&self, docs: Vec<Document>) -> Result<()> {
        self.with_writer(|w| w.add_documents(docs))
    }

    pub fn index_multi_column_docs(&self, row_id: u64, column_names: &[String], column_docs: &[String]) -> Result<()> {
        self.with_writer(|w| w.index_multi_column_docs(RowId(row_id), column_names, column_docs))
    }

    pub fn commit(&self) -> Result<Option<SegmentId>> {
        self.with_writer(|w| w.commit())
    }

    pub fn delete_rows(&self, row_ids: &[u64]) -> Result<()> {
        self.with_writer(|w| w.delete_rows(row_ids))
    }

    pub fn merge_segments(&self) -> Result<bool> {
        self.with_writer(|w| w.merge_segments())
    }

    // Reader state

    /// Pin the latest committed segments and tombstones
    pub fn load_reader(&self) -> Result<()> {
        if !self.has_writer() {
            self.refresh_from_disk()?;
        }
        let snapshot = self.mvcc.current_snapshot();
        debug!(version = snapshot.version, segments = snapshot.segments.len(), "reader loaded");
        *self.reader.write() = Some(Arc::new(IndexReader::new(snapshot, self.schema.clone())));
        Ok(())
    }

    /// Replace a loaded reader with one on the latest snapshot
    pub fn reload_reader(&self) -> Result<()> {
        if self.reader.read().is_none() {
            return Err(no_reader(&self.storage));
        }
        self.load_reader()
    }

    pub fn free_reader(&self) -> Result<()> {
        match self.reader.write().take() {
            Some(_) => Ok(()),
            None => Err(no_reader(&self.storage)),
        }
    }

    pub fn has_reader(&self) -> bool {
        self.reader.read().is_some()
    }

    /// The loaded reader; queries on it never block ingestion
    pub fn reader(&self) -> Result<Arc<IndexReader>> {
        self.reader.read()
            .clone()
            .ok_or_else(|| no_reader(&self.storage))
    }
}

fn no_writer(storage: &StorageLayout) -> Error {
    Error::not_found(format!("no writer loaded for {}", storage.base_dir.display()))
}

fn no_reader(storage: &StorageLayout) -> Error {
    Error::not_found(format!("no reader loaded for {}", storage.base_dir.display()))
}
