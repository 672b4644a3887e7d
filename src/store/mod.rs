//! Index stores: the inverted index, its catalogue, commit scheduling
//! and the cursor protocol exposed to callers

pub mod catalogue;
pub mod commit_queue;
pub mod registry;
pub mod runner;

pub use catalogue::{Catalogue, CATALOGUE_FILE};
pub use commit_queue::CommitQueue;
pub use registry::StoreRegistry;
pub use runner::{serialize_result_id, QueryRunner, ResultIterator};

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::{FathomError, Result};
use crate::index::{load_index, DocumentId, IndexData, IndexDocument, IndexReader, IndexWriter};
use crate::models::Query;
use crate::search::PropertyMap;

/// A persistent store: inverted index plus id→path catalogue under one
/// directory, with single-writer transactional mutation
pub struct IndexStore {
    config: StoreConfig,
    property_map: PropertyMap,
    catalogue: Catalogue,
    published: Arc<ArcSwap<IndexData>>,
    write_lock: Arc<Mutex<()>>,
    runner: QueryRunner,
}

impl IndexStore {
    /// Open a store, creating both artefacts if absent. Idempotent.
    pub fn open(config: StoreConfig, property_map: PropertyMap) -> Result<Arc<Self>> {
        std::fs::create_dir_all(&config.root).map_err(|e| FathomError::StoreOpen {
            path: config.root.display().to_string(),
            reason: e.to_string(),
        })?;

        let catalogue = Catalogue::open(&config.root)?;
        let data = load_index(&config.root).map_err(|e| FathomError::StoreOpen {
            path: config.root.display().to_string(),
            reason: e.to_string(),
        })?;

        info!(
            root = %config.root.display(),
            store_type = %config.store_type,
            docs = data.doc_count(),
            "index store opened"
        );

        Ok(Arc::new(Self {
            config,
            property_map,
            catalogue,
            published: Arc::new(ArcSwap::from_pointee(data)),
            write_lock: Arc::new(Mutex::new(())),
            runner: QueryRunner::new(),
        }))
    }

    /// Open the file store with its default property map
    pub fn open_file_store(config: StoreConfig) -> Result<Arc<Self>> {
        Self::open(config, PropertyMap::file_store_defaults())
    }

    pub fn store_type(&self) -> &str {
        &self.config.store_type
    }

    /// Content types this store claims
    pub fn types(&self) -> &[String] {
        &self.config.types
    }

    /// The published property→prefix/slot map
    pub fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn runner(&self) -> &QueryRunner {
        &self.runner
    }

    // Catalogue operations

    pub fn id_for_path(&self, path: &Path) -> Result<Option<DocumentId>> {
        self.catalogue.id_for_path(path)
    }

    pub fn create_path_mapping(&self, path: &Path) -> Result<DocumentId> {
        self.catalogue.create_path_mapping(path)
    }

    pub fn path_for_id(&self, id: DocumentId) -> Result<Option<std::path::PathBuf>> {
        self.catalogue.path_for_id(id)
    }

    /// Point an id at a new path; the indexed document keeps its id
    pub fn rename_path(&self, id: DocumentId, new_path: &Path) -> Result<()> {
        self.catalogue.rename_path(id, new_path)
    }

    pub fn delete_id(&self, id: DocumentId) -> Result<()> {
        self.catalogue.delete_id(id)
    }

    /// Drop a path from the catalogue; the caller enqueues the matching
    /// index removal. Used on file deletion and moves out of scope.
    pub fn remove_path(&self, path: &Path) -> Result<Option<DocumentId>> {
        let Some(id) = self.catalogue.id_for_path(path)? else {
            return Ok(None);
        };
        self.catalogue.delete_id(id)?;
        Ok(Some(id))
    }

    // Index operations

    /// Acquire the process-wide writer lock; a second concurrent writer
    /// fails with `WriterBusy`
    pub fn begin_write(&self) -> Result<IndexWriter> {
        match self.write_lock.try_lock_arc() {
            Some(guard) => Ok(IndexWriter::new(
                &self.config.root,
                self.published.clone(),
                guard,
            )),
            None => Err(FathomError::WriterBusy),
        }
    }

    /// Apply one batch of mutations: replaces, then deletes, then commit.
    ///
    /// The catalogue transaction is committed immediately before the index
    /// transaction so both artefacts agree at the commit boundary.
    /// Contention is retried with exponential backoff; exhausting the
    /// budget surfaces `CommitFailed` with no partial effect.
    pub fn apply_batch(
        &self,
        adds: &[(DocumentId, IndexDocument)],
        removes: &[DocumentId],
    ) -> Result<()> {
        let retry = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_apply(adds, removes) {
                Ok(()) => return Ok(()),
                Err(err) if err.is_retriable() && attempt < retry.max_attempts => {
                    warn!(attempt, error = %err, "batch commit contended, retrying");
                    std::thread::sleep(retry.backoff(attempt));
                }
                Err(err) if err.is_retriable() => {
                    return Err(FathomError::CommitFailed {
                        attempts: attempt,
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn try_apply(
        &self,
        adds: &[(DocumentId, IndexDocument)],
        removes: &[DocumentId],
    ) -> Result<()> {
        let mut writer = self.begin_write()?;
        self.catalogue.checkpoint()?;
        for (id, doc) in adds {
            writer.replace_document(*id, doc.clone());
        }
        for id in removes {
            writer.delete_document(*id);
        }
        writer.commit()
    }

    /// A reader over the published snapshot; call `reopen` before each
    /// query to observe the latest committed state
    pub fn reader(&self) -> IndexReader {
        IndexReader::new(&self.config.root, self.published.clone())
    }

    /// Execute a query and return a cursor over its results
    pub fn query(self: &Arc<Self>, query: &Query) -> Result<ResultIterator> {
        let handle = self.runner.exec(self, query)?;
        Ok(ResultIterator::new(self.clone(), handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentBuilder;
    use tempfile::TempDir;

    fn open_store(tmp: &TempDir) -> Arc<IndexStore> {
        IndexStore::open_file_store(StoreConfig::new(tmp.path(), "file")).unwrap()
    }

    fn text_doc(text: &str) -> IndexDocument {
        let mut builder = DocumentBuilder::new();
        builder.index_text(text, None, 1);
        builder.into_document()
    }

    #[test]
    fn test_open_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let _store = open_store(&tmp);
        let _store = open_store(&tmp);
    }

    #[test]
    fn test_open_unwritable_dir_fails() {
        let result = IndexStore::open_file_store(StoreConfig::new(
            "/proc/definitely/not/writable",
            "file",
        ));
        assert!(matches!(result, Err(FathomError::StoreOpen { .. })));
    }

    #[test]
    fn test_second_writer_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let _writer = store.begin_write().unwrap();
        assert!(matches!(store.begin_write(), Err(FathomError::WriterBusy)));
    }

    #[test]
    fn test_writer_lock_released_on_drop() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        drop(store.begin_write().unwrap());
        assert!(store.begin_write().is_ok());
    }

    #[test]
    fn test_apply_batch_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let id = store.create_path_mapping(Path::new("/home/t/a")).unwrap();
        store
            .apply_batch(&[(id, text_doc("hello world"))], &[])
            .unwrap();

        let snapshot = store.reader().reopen().unwrap();
        assert!(snapshot.contains(id));

        store.apply_batch(&[], &[id]).unwrap();
        let snapshot = store.reader().reopen().unwrap();
        assert!(!snapshot.contains(id));
    }

    #[test]
    fn test_stale_snapshot_keeps_working() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let id = store.create_path_mapping(Path::new("/home/t/a")).unwrap();
        store.apply_batch(&[(id, text_doc("first"))], &[]).unwrap();

        let stale = store.reader().reopen().unwrap();
        store.apply_batch(&[], &[id]).unwrap();

        // The pinned snapshot still shows the pre-commit state
        assert!(stale.contains(id));
        assert!(!store.reader().reopen().unwrap().contains(id));
    }
}
