//! The id→path catalogue
//!
//! A small sqlite database (`fileMap.sqlite3`) next to the index maps
//! stable document ids to source paths. Ids are allocated by sqlite's
//! rowid autoincrement and never reused within a store's lifetime.
//!
//! The connection keeps one transaction open at all times; `checkpoint`
//! commits it and opens the next one, and is called immediately before
//! each index commit so both artefacts advance together.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::error::{FathomError, Result};
use crate::index::DocumentId;

pub const CATALOGUE_FILE: &str = "fileMap.sqlite3";

/// Catalogue mapping document ids to source paths
pub struct Catalogue {
    conn: Mutex<Connection>,
}

impl Catalogue {
    /// Open or create the catalogue under the store root
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(CATALOGUE_FILE);
        let conn = Connection::open(&path).map_err(|e| FathomError::StoreOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        conn.busy_timeout(std::time::Duration::from_millis(250))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS files(\
                id INTEGER PRIMARY KEY AUTOINCREMENT, \
                url TEXT NOT NULL UNIQUE); \
             CREATE INDEX IF NOT EXISTS fileUrl_index ON files(url);",
        )?;
        conn.execute_batch("BEGIN")?;

        info!(path = %path.display(), "catalogue opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The id of a previously observed path
    pub fn id_for_path(&self, path: &Path) -> Result<Option<DocumentId>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                "SELECT id FROM files WHERE url = ?1",
                params![path_text(path)],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|i| i as DocumentId))
    }

    /// Allocate an id for a path, or return the existing one
    pub fn create_path_mapping(&self, path: &Path) -> Result<DocumentId> {
        let conn = self.conn.lock();
        let url = path_text(path);
        conn.execute(
            "INSERT OR IGNORE INTO files(url) VALUES (?1)",
            params![url],
        )?;
        let id = conn.query_row(
            "SELECT id FROM files WHERE url = ?1",
            params![url],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(id as DocumentId)
    }

    pub fn path_for_id(&self, id: DocumentId) -> Result<Option<PathBuf>> {
        let conn = self.conn.lock();
        let url = conn
            .query_row(
                "SELECT url FROM files WHERE id = ?1",
                params![id as i64],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(url.map(PathBuf::from))
    }

    /// Point an existing id at a new path
    pub fn rename_path(&self, id: DocumentId, new_path: &Path) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE files SET url = ?1 WHERE id = ?2",
            params![path_text(new_path), id as i64],
        )?;
        Ok(())
    }

    /// Drop the mapping for an id
    pub fn delete_id(&self, id: DocumentId) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM files WHERE id = ?1", params![id as i64])?;
        Ok(())
    }

    /// Commit the open transaction and begin the next one
    pub fn checkpoint(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("COMMIT; BEGIN")?;
        Ok(())
    }
}

impl Drop for Catalogue {
    fn drop(&mut self) {
        let conn = self.conn.lock();
        let _ = conn.execute_batch("COMMIT");
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
