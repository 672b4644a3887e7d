//! Single-writer transactions and checkpoint persistence
//!
//! Commit discipline: write the checkpoint to a `.tmp` file, fsync,
//! atomically rename over the live file, then advance the manifest the
//! same way. A writer that dies before the manifest rename leaves the
//! previous committed snapshot intact.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::index::data::IndexData;
use crate::index::document::IndexDocument;
use crate::index::DocumentId;

const INDEX_FILE: &str = "index.bin";
const MANIFEST_FILE: &str = "index.manifest";

/// Manifest describing the committed checkpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub generation: u64,
    pub doc_count: u64,
    pub updated_at: u64,
}

impl IndexManifest {
    pub const VERSION: u32 = 1;
}

/// Read the manifest if one exists
pub fn read_manifest(root: &Path) -> Result<Option<IndexManifest>> {
    let path = root.join(MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let manifest = serde_json::from_slice(&bytes)
        .map_err(|e| crate::error::FathomError::Internal(format!("bad manifest: {e}")))?;
    Ok(Some(manifest))
}

/// Load the committed index state; an absent checkpoint is an empty index
pub fn load_index(root: &Path) -> Result<IndexData> {
    let path = root.join(INDEX_FILE);
    if !path.exists() {
        return Ok(IndexData::new());
    }
    let bytes = fs::read(path)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// An open single-writer transaction over one index
///
/// Holds the process-wide writer lock for its whole lifetime; mutations
/// apply to a private working copy and become visible only on `commit`.
pub struct IndexWriter {
    root: PathBuf,
    data: IndexData,
    published: Arc<ArcSwap<IndexData>>,
    _guard: ArcMutexGuard<RawMutex, ()>,
}

impl IndexWriter {
    pub(crate) fn new(
        root: &Path,
        published: Arc<ArcSwap<IndexData>>,
        guard: ArcMutexGuard<RawMutex, ()>,
    ) -> Self {
        let data = (**published.load()).clone();
        Self {
            root: root.to_path_buf(),
            data,
            published,
            _guard: guard,
        }
    }

    /// Atomically replace the whole document for an id
    pub fn replace_document(&mut self, doc_id: DocumentId, doc: IndexDocument) {
        self.data.replace_document(doc_id, doc);
    }

    /// Remove a document; absent ids are ignored
    pub fn delete_document(&mut self, doc_id: DocumentId) {
        self.data.delete_document(doc_id);
    }

    pub fn doc_count(&self) -> u64 {
        self.data.doc_count()
    }

    /// Persist the working copy and publish it to readers
    pub fn commit(&mut self) -> Result<()> {
        self.data.generation += 1;

        let payload = bincode::serialize(&self.data)?;
        write_atomically(&self.root.join(INDEX_FILE), &payload)?;

        let manifest = IndexManifest {
            version: IndexManifest::VERSION,
            generation: self.data.generation,
            doc_count: self.data.doc_count(),
            updated_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| crate::error::FathomError::Internal(e.to_string()))?;
        write_atomically(&self.root.join(MANIFEST_FILE), &manifest_bytes)?;

        self.published.store(Arc::new(self.data.clone()));
        debug!(
            generation = self.data.generation,
            docs = self.data.doc_count(),
            "index committed"
        );
        Ok(())
    }
}

fn write_atomically(path: &Path, payload: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        file.write_all(payload)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::document::DocumentBuilder;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn sample_doc(text: &str) -> IndexDocument {
        let mut builder = DocumentBuilder::new();
        builder.index_text(text, None, 1);
        builder.into_document()
    }

    fn open_writer(root: &Path, published: &Arc<ArcSwap<IndexData>>) -> IndexWriter {
        let lock = Arc::new(Mutex::new(()));
        IndexWriter::new(root, published.clone(), lock.lock_arc())
    }

    #[test]
    fn test_commit_persists_and_publishes() {
        let tmp = TempDir::new().unwrap();
        let published = Arc::new(ArcSwap::from_pointee(IndexData::new()));

        let mut writer = open_writer(tmp.path(), &published);
        writer.replace_document(1, sample_doc("hello world"));
        writer.commit().unwrap();

        assert_eq!(published.load().generation, 1);
        assert!(published.load().contains(1));

        let reloaded = load_index(tmp.path()).unwrap();
        assert_eq!(reloaded.generation, 1);
        assert!(reloaded.contains(1));

        let manifest = read_manifest(tmp.path()).unwrap().unwrap();
        assert_eq!(manifest.generation, 1);
        assert_eq!(manifest.doc_count, 1);
    }

    #[test]
    fn test_uncommitted_changes_invisible() {
        let tmp = TempDir::new().unwrap();
        let published = Arc::new(ArcSwap::from_pointee(IndexData::new()));

        let mut writer = open_writer(tmp.path(), &published);
        writer.replace_document(1, sample_doc("pending"));

        assert!(!published.load().contains(1));
        assert_eq!(load_index(tmp.path()).unwrap().doc_count(), 0);

        writer.commit().unwrap();
        assert!(published.load().contains(1));
    }

    #[test]
    fn test_sequential_commits_order() {
        let tmp = TempDir::new().unwrap();
        let published = Arc::new(ArcSwap::from_pointee(IndexData::new()));

        let mut writer = open_writer(tmp.path(), &published);
        writer.replace_document(1, sample_doc("first"));
        writer.commit().unwrap();
        drop(writer);

        let mut writer = open_writer(tmp.path(), &published);
        writer.delete_document(1);
        writer.replace_document(2, sample_doc("second"));
        writer.commit().unwrap();

        let data = published.load();
        assert_eq!(data.generation, 2);
        assert!(!data.contains(1));
        assert!(data.contains(2));
    }
}
