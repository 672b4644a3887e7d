//! Extraction/indexing job pipeline
//!
//! Drives per-file extraction through content-type-dispatched plugins,
//! accumulates the resulting documents and commits them in batches.

mod driver;
mod plugin;

pub use driver::{ExtractionDriver, MimeResolver, TERM_BATCH_LIMIT};
pub use plugin::{ExtractionResult, ExtractorPlugin};
