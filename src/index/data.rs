//! Committed index state and reader snapshots

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap, HashMap};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::index::document::IndexDocument;
use crate::index::postings::{Posting, PostingList};
use crate::index::writer::{load_index, read_manifest};
use crate::index::DocumentId;

/// One committed, immutable snapshot of the inverted index
///
/// The term dictionary is ordered so synonym expansion can enumerate all
/// completions of a prefix; stored termlists make whole-document
/// replacement and deletion possible without rescanning postings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IndexData {
    pub generation: u64,
    postings: BTreeMap<String, PostingList>,
    documents: HashMap<DocumentId, IndexDocument>,
}

impl IndexData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn doc_count(&self) -> u64 {
        self.documents.len() as u64
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn contains(&self, doc: DocumentId) -> bool {
        self.documents.contains_key(&doc)
    }

    pub fn document(&self, doc: DocumentId) -> Option<&IndexDocument> {
        self.documents.get(&doc)
    }

    pub fn postings(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    /// Positions of a term within one document
    pub fn positions(&self, term: &str, doc: DocumentId) -> Option<&[u32]> {
        self.postings(term)
            .and_then(|list| list.get(doc))
            .map(|p| p.positions.as_slice())
    }

    /// Bitmap over every live document
    pub fn all_documents(&self) -> RoaringTreemap {
        self.documents.keys().copied().collect()
    }

    /// Iterate (id, document) pairs; order is unspecified
    pub fn iter_documents(&self) -> impl Iterator<Item = (DocumentId, &IndexDocument)> {
        self.documents.iter().map(|(id, doc)| (*id, doc))
    }

    /// Replace the entire document for an id
    pub fn replace_document(&mut self, doc_id: DocumentId, doc: IndexDocument) {
        self.delete_document(doc_id);
        for (term, data) in &doc.terms {
            let posting = Posting {
                doc: doc_id,
                wdf: data.wdf,
                positions: data.positions.clone(),
            };
            self.postings.entry(term.clone()).or_default().upsert(posting);
        }
        self.documents.insert(doc_id, doc);
    }

    /// Remove a document and all of its postings
    pub fn delete_document(&mut self, doc_id: DocumentId) -> bool {
        let Some(old) = self.documents.remove(&doc_id) else {
            return false;
        };
        for term in old.terms.keys() {
            if let Some(list) = self.postings.get_mut(term) {
                list.remove(doc_id);
                if list.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        true
    }

    /// Enumerate the dictionary terms beginning with `prefix`, keeping the
    /// `limit` entries with the highest collection frequency.
    ///
    /// A bounded min-heap keeps the scan cheap even for short prefixes
    /// with many completions.
    pub fn expand_prefix(&self, prefix: &str, limit: usize) -> Vec<String> {
        let mut heap: BinaryHeap<Reverse<(u64, String)>> = BinaryHeap::with_capacity(limit + 1);

        let range = self.postings.range::<String, _>((
            Bound::Included(prefix.to_string()),
            Bound::Unbounded,
        ));
        for (term, list) in range {
            if !term.starts_with(prefix) {
                break;
            }
            heap.push(Reverse((list.collection_frequency(), term.clone())));
            if heap.len() > limit {
                heap.pop();
            }
        }

        heap.into_iter().map(|Reverse((_, term))| term).collect()
    }
}

/// Shared read access to the published snapshot of one index
///
/// Pinned snapshots stay valid after later commits; `reopen` observes the
/// latest committed state, reloading from disk when another process (or a
/// writer on a different store handle) advanced the manifest generation.
pub struct IndexReader {
    root: PathBuf,
    published: Arc<ArcSwap<IndexData>>,
}

impl IndexReader {
    pub fn new(root: &Path, published: Arc<ArcSwap<IndexData>>) -> Self {
        Self {
            root: root.to_path_buf(),
            published,
        }
    }

    /// The currently published snapshot, without a staleness check
    pub fn snapshot(&self) -> Arc<IndexData> {
        self.published.load_full()
    }

    /// Observe the latest committed snapshot
    pub fn reopen(&self) -> Result<Arc<IndexData>> {
        let current = self.published.load_full();
        match read_manifest(&self.root)? {
            Some(manifest) if manifest.generation > current.generation => {
                let fresh = Arc::new(load_index(&self.root)?);
                self.published.store(fresh.clone());
                Ok(fresh)
            }
            _ => Ok(current),
        }
    }
}
