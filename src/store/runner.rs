//! Query execution and the cursor protocol
//!
//! A runner keeps a table of live cursors keyed by monotonically numbered
//! handles. Each cursor pins the snapshot its query ran against; the
//! current row's path is resolved through the catalogue lazily and cached
//! within the cursor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::Result;
use crate::index::{DocumentId, IndexData};
use crate::models::Query;
use crate::search::QueryCompiler;
use crate::store::IndexStore;

/// Encode a result id: ASCII store type, a 0x00 separator, big-endian id
pub fn serialize_result_id(store_type: &str, doc: DocumentId) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(store_type.len() + 9);
    bytes.extend_from_slice(store_type.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&doc.to_be_bytes());
    bytes
}

/// Decode a result id produced by [`serialize_result_id`]
pub fn deserialize_result_id(bytes: &[u8]) -> Option<(String, DocumentId)> {
    let sep = bytes.iter().position(|b| *b == 0)?;
    let (ty, rest) = bytes.split_at(sep);
    let id_bytes: [u8; 8] = rest[1..].try_into().ok()?;
    Some((
        String::from_utf8(ty.to_vec()).ok()?,
        DocumentId::from_be_bytes(id_bytes),
    ))
}

struct Cursor {
    results: Vec<DocumentId>,
    next_index: usize,
    current: Option<DocumentId>,
    cached_path: Option<PathBuf>,
    // Pinned for the handle's lifetime; later commits do not disturb
    // an open cursor
    _snapshot: Arc<IndexData>,
}

/// Executes compiled queries and serves cursors over their results
pub struct QueryRunner {
    cursors: Mutex<HashMap<u64, Arc<Mutex<Cursor>>>>,
    next_handle: AtomicU64,
}

impl Default for QueryRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRunner {
    pub fn new() -> Self {
        Self {
            cursors: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Compile and run a query; returns the new cursor's handle,
    /// positioned before the first result
    pub fn exec(&self, store: &IndexStore, query: &Query) -> Result<u64> {
        let snapshot = store.reader().reopen()?;
        let compiled = QueryCompiler::new(store.property_map(), Some(&snapshot)).compile(query)?;
        let results = compiled.execute(&snapshot).ranked(query.limit as usize);

        debug!(
            store_type = store.store_type(),
            hits = results.len(),
            "query executed"
        );

        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.cursors.lock().insert(
            handle,
            Arc::new(Mutex::new(Cursor {
                results,
                next_index: 0,
                current: None,
                cached_path: None,
                _snapshot: snapshot,
            })),
        );
        Ok(handle)
    }

    fn cursor(&self, handle: u64) -> Option<Arc<Mutex<Cursor>>> {
        self.cursors.lock().get(&handle).cloned()
    }

    /// Advance the cursor; false at end, after which `id` and `path`
    /// return empty
    pub fn next(&self, handle: u64) -> bool {
        let Some(cursor) = self.cursor(handle) else {
            return false;
        };
        let mut cursor = cursor.lock();
        cursor.cached_path = None;
        if cursor.next_index < cursor.results.len() {
            cursor.current = Some(cursor.results[cursor.next_index]);
            cursor.next_index += 1;
            true
        } else {
            cursor.current = None;
            false
        }
    }

    /// Encoded `(store type, document id)` of the current row
    pub fn id(&self, store: &IndexStore, handle: u64) -> Vec<u8> {
        let Some(cursor) = self.cursor(handle) else {
            return Vec::new();
        };
        let cursor = cursor.lock();
        cursor
            .current
            .map(|doc| serialize_result_id(store.store_type(), doc))
            .unwrap_or_default()
    }

    /// Source path of the current row, resolved lazily via the catalogue
    pub fn path(&self, store: &IndexStore, handle: u64) -> Option<PathBuf> {
        let cursor = self.cursor(handle)?;
        let mut cursor = cursor.lock();
        let doc = cursor.current?;
        if cursor.cached_path.is_none() {
            cursor.cached_path = store.path_for_id(doc).ok().flatten();
        }
        cursor.cached_path.clone()
    }

    /// Release the cursor and its pinned snapshot
    pub fn close(&self, handle: u64) {
        self.cursors.lock().remove(&handle);
    }

    pub fn open_cursors(&self) -> usize {
        self.cursors.lock().len()
    }
}

/// Caller-facing cursor over one query's results
pub struct ResultIterator {
    store: Option<Arc<IndexStore>>,
    handle: u64,
}

impl ResultIterator {
    pub(crate) fn new(store: Arc<IndexStore>, handle: u64) -> Self {
        Self {
            store: Some(store),
            handle,
        }
    }

    /// An iterator over no results; used when no store claims a query
    pub fn empty() -> Self {
        Self {
            store: None,
            handle: 0,
        }
    }

    pub fn next(&self) -> bool {
        match &self.store {
            Some(store) => store.runner().next(self.handle),
            None => false,
        }
    }

    pub fn id(&self) -> Vec<u8> {
        match &self.store {
            Some(store) => store.runner().id(store, self.handle),
            None => Vec::new(),
        }
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.store
            .as_ref()
            .and_then(|store| store.runner().path(store, self.handle))
    }

    /// The current row's document id, when positioned on a row
    pub fn document_id(&self) -> Option<DocumentId> {
        deserialize_result_id(&self.id()).map(|(_, id)| id)
    }
}

impl Drop for ResultIterator {
    fn drop(&mut self) {
        if let Some(store) = &self.store {
            store.runner().close(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_id_roundtrip() {
        let encoded = serialize_result_id("file", 42);
        assert_eq!(&encoded[..4], b"file");
        assert_eq!(encoded[4], 0);
        assert_eq!(deserialize_result_id(&encoded), Some(("file".to_string(), 42)));
    }

    #[test]
    fn test_result_id_is_big_endian() {
        let encoded = serialize_result_id("f", 1);
        assert_eq!(&encoded[2..], &[0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_empty_iterator() {
        let iter = ResultIterator::empty();
        assert!(!iter.next());
        assert!(iter.id().is_empty());
        assert_eq!(iter.path(), None);
    }
}
