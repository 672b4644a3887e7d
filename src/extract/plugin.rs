//! Extractor plugin contract

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::index::{DocumentBuilder, DocumentId, IndexDocument};

/// A per-format metadata extractor
///
/// Plugins must be deterministic on identical inputs and must not retain
/// references past the `extract` call. A failing plugin only loses its
/// own contribution; the document is still written with whatever earlier
/// plugins produced.
pub trait ExtractorPlugin: Send + Sync {
    /// Plugin name used in logs
    fn name(&self) -> &str;

    /// MIME types this plugin claims
    fn mimetypes(&self) -> Vec<String>;

    /// Append terms, positional text and value slots for the input
    fn extract(&self, result: &mut ExtractionResult) -> Result<()>;
}

/// The shared accumulation target handed to each plugin
pub struct ExtractionResult {
    input_path: PathBuf,
    input_mime: String,
    id: DocumentId,
    builder: DocumentBuilder,
}

impl ExtractionResult {
    pub fn new(input_path: &Path, input_mime: &str, id: DocumentId) -> Self {
        Self {
            input_path: input_path.to_path_buf(),
            input_mime: input_mime.to_string(),
            id,
            builder: DocumentBuilder::new(),
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn input_mime(&self) -> &str {
        &self.input_mime
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn document_builder(&mut self) -> &mut DocumentBuilder {
        &mut self.builder
    }

    pub fn term_count(&self) -> usize {
        self.builder.term_count()
    }

    /// Value slots accumulated so far
    pub fn value_slots(&self) -> &std::collections::BTreeMap<u16, Vec<u8>> {
        &self.builder.document().slots
    }

    pub fn into_parts(self) -> (DocumentId, IndexDocument) {
        (self.id, self.builder.into_document())
    }
}
