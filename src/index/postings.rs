//! Posting lists: per-term document entries with weight and positions

use serde::{Deserialize, Serialize};

use crate::index::DocumentId;

/// A single posting entry within a posting list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocumentId,
    /// Within-document frequency; zero for boolean terms
    pub wdf: u32,
    /// Position offsets for phrase matching; empty for boolean terms
    pub positions: Vec<u32>,
}

/// All postings for one term, kept sorted by document id
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingList {
    postings: Vec<Posting>,
}

impl PostingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for a document
    pub fn upsert(&mut self, posting: Posting) {
        match self.postings.binary_search_by_key(&posting.doc, |p| p.doc) {
            Ok(idx) => self.postings[idx] = posting,
            Err(idx) => self.postings.insert(idx, posting),
        }
    }

    /// Remove the entry for a document; returns whether one existed
    pub fn remove(&mut self, doc: DocumentId) -> bool {
        match self.postings.binary_search_by_key(&doc, |p| p.doc) {
            Ok(idx) => {
                self.postings.remove(idx);
                true
            }
            Err(_) => false,
        }
    }

    pub fn get(&self, doc: DocumentId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc, |p| p.doc)
            .ok()
            .map(|idx| &self.postings[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// Number of documents containing this term
    pub fn doc_frequency(&self) -> u32 {
        self.postings.len() as u32
    }

    /// Total occurrences of this term across all documents
    pub fn collection_frequency(&self) -> u64 {
        self.postings.iter().map(|p| p.wdf as u64).sum()
    }
}
