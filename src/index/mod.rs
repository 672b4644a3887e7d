//! Persistent inverted index
//!
//! The index holds one committed, immutable snapshot at a time. A single
//! writer mutates a working copy and publishes it atomically on commit
//! (checkpoint file + manifest written tmp-then-rename); readers pin the
//! published snapshot and call `reopen` to observe later commits.

pub mod data;
pub mod document;
pub mod postings;
pub mod query;
pub mod sortable;
pub mod writer;

pub use data::{IndexData, IndexReader};
pub use document::{DocumentBuilder, IndexDocument, TermData};
pub use postings::{Posting, PostingList};
pub use query::{IndexQuery, ResultSet};
pub use sortable::{serialise_f64, unserialise_f64};
pub use writer::{load_index, IndexManifest, IndexWriter};

/// External document identifier, allocated by the path catalogue
pub type DocumentId = u64;
