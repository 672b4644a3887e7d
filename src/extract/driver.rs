//! The extraction driver
//!
//! For each input path: resolve its document id, determine the MIME
//! type, run every claiming plugin, and accumulate the result. Batches
//! commit once the aggregate term count crosses the threshold; the rest
//! commits after the last input. In binary-data mode the driver
//! serialises the accumulated slot maps to stdout instead of writing to
//! the index.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, warn};

use crate::error::{FathomError, Result};
use crate::extract::plugin::{ExtractionResult, ExtractorPlugin};
use crate::index::DocumentId;
use crate::store::IndexStore;

/// Aggregate term count that triggers an early batch commit; documents
/// with this many terms occupy roughly 10 MB
pub const TERM_BATCH_LIMIT: usize = 10_000;

/// Delay between retries when the index writer is busy
const WRITER_RETRY_DELAY: Duration = Duration::from_millis(100);
const WRITER_RETRY_ATTEMPTS: u32 = 50;

/// Extension-based MIME type detection
#[derive(Clone, Debug, Default)]
pub struct MimeResolver;

impl MimeResolver {
    pub fn resolve(&self, path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "txt" | "log" => "text/plain",
            "md" => "text/markdown",
            "html" | "htm" => "text/html",
            "pdf" => "application/pdf",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "mp3" => "audio/mpeg",
            "ogg" => "audio/ogg",
            "flac" => "audio/flac",
            "mp4" => "video/mp4",
            "mkv" => "video/x-matroska",
            "zip" => "application/zip",
            "tar" => "application/x-tar",
            "vcf" => "text/vcard",
            "eml" => "message/rfc822",
            _ => "application/octet-stream",
        }
        .to_string()
    }
}

/// Drives per-file extraction and batched commits against one store
pub struct ExtractionDriver {
    store: Arc<IndexStore>,
    plugins: Vec<Arc<dyn ExtractorPlugin>>,
    mime_resolver: MimeResolver,
    results: Vec<ExtractionResult>,
    term_count: usize,
    binary_data_mode: bool,
}

impl ExtractionDriver {
    pub fn new(store: Arc<IndexStore>) -> Self {
        Self {
            store,
            plugins: Vec::new(),
            mime_resolver: MimeResolver,
            results: Vec::new(),
            term_count: 0,
            binary_data_mode: false,
        }
    }

    pub fn register_plugin(&mut self, plugin: Arc<dyn ExtractorPlugin>) {
        self.plugins.push(plugin);
    }

    /// Serialise slot maps to stdout instead of writing to the index
    pub fn binary_data_mode(mut self) -> Self {
        self.binary_data_mode = true;
        self
    }

    /// Process every input path, committing batches as the term budget
    /// fills, then flush the remainder
    pub fn process(&mut self, paths: &[&Path]) -> Result<()> {
        for path in paths {
            self.process_path(path)?;
            if self.term_count >= TERM_BATCH_LIMIT {
                self.save_changes()?;
            }
        }

        if self.binary_data_mode {
            self.emit_binary_data(&mut std::io::stdout().lock())?;
        } else {
            self.save_changes()?;
        }
        Ok(())
    }

    fn process_path(&mut self, path: &Path) -> Result<()> {
        let id = match self.store.id_for_path(path)? {
            Some(id) => id,
            None => {
                if self.binary_data_mode {
                    // No catalogue writes in pipe mode; skip unknown paths
                    return Ok(());
                }
                self.store.create_path_mapping(path)?
            }
        };

        let mime = self.mime_resolver.resolve(path);
        let mut result = ExtractionResult::new(path, &mime, id);

        for plugin in &self.plugins {
            if !plugin.mimetypes().iter().any(|m| *m == mime) {
                continue;
            }
            // A faulty plugin loses only its own contribution
            if let Err(err) = plugin.extract(&mut result) {
                warn!(
                    plugin = plugin.name(),
                    path = %path.display(),
                    error = %err,
                    "extractor fault"
                );
            }
        }

        self.term_count += result.term_count();
        self.results.push(result);
        Ok(())
    }

    /// Commit accumulated results, retrying while the writer is busy
    fn save_changes(&mut self) -> Result<()> {
        if self.results.is_empty() {
            return Ok(());
        }

        let batch: Vec<(DocumentId, crate::index::IndexDocument)> = self
            .results
            .drain(..)
            .map(ExtractionResult::into_parts)
            .collect();
        self.term_count = 0;

        let mut attempts = 0;
        loop {
            match self.store.apply_batch(&batch, &[]) {
                Ok(()) => {
                    debug!(docs = batch.len(), "extraction batch committed");
                    return Ok(());
                }
                Err(FathomError::WriterBusy) if attempts < WRITER_RETRY_ATTEMPTS => {
                    attempts += 1;
                    std::thread::sleep(WRITER_RETRY_DELAY);
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Serialise `{id → slot map}` pairs as base64 for the parent
    /// process to absorb
    fn emit_binary_data(&mut self, out: &mut impl Write) -> Result<()> {
        let slot_maps: Vec<(DocumentId, BTreeMap<u16, Vec<u8>>)> = self
            .results
            .drain(..)
            .map(|result| {
                let (id, doc) = result.into_parts();
                (id, doc.slots)
            })
            .collect();
        self.term_count = 0;

        let payload = bincode::serialize(&slot_maps)?;
        out.write_all(BASE64.encode(payload).as_bytes())?;
        Ok(())
    }

    pub fn pending_documents(&self) -> usize {
        self.results.len()
    }
}
