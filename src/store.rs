//! SQLite persistence and the keyset read path for loaded pages.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::CorpusError;

/// One persisted wiki page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Generated primary key, also the pagination cursor.
    pub id: String,
    /// Last modification time carried over from the dump.
    pub updated_at: DateTime<Utc>,
    /// Page title.
    pub title: String,
    /// Page body markup.
    pub text: String,
}

/// Handle to the relational store.
///
/// The read path holds no cursor state between calls; pagination cursors
/// are caller-owned.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, CorpusError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, CorpusError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Drops any previous `pages` table and recreates the schema.
    pub fn setup(&self) -> Result<(), CorpusError> {
        self.conn.execute_batch(
            "DROP TABLE IF EXISTS pages;
             CREATE TABLE pages (
                 id         TEXT PRIMARY KEY,
                 updated_at TEXT NOT NULL,
                 title      TEXT NOT NULL,
                 text       TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    /// Exclusive access to the underlying connection, used by the loader
    /// to scope its per-shard transaction.
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Point lookup by primary key.
    pub fn get(&self, id: &str) -> Result<Page, CorpusError> {
        self.conn
            .query_row(
                "SELECT id, updated_at, title, text FROM pages WHERE id = ?1",
                [id],
                page_from_row,
            )
            .optional()?
            .ok_or_else(|| CorpusError::PageNotFound { id: id.to_string() })
    }

    /// Returns up to `limit` ids strictly greater than `cursor`, ascending.
    ///
    /// `None` means "from the start". Calling again with the last returned
    /// id as the cursor yields the next page with no duplicates and no
    /// gaps; an empty or short result marks the end.
    pub fn list_ids(&self, cursor: Option<&str>, limit: u32) -> Result<Vec<String>, CorpusError> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM pages
             WHERE ?1 IS NULL OR id > ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], |row| row.get(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Like [`Store::list_ids`], but returns whole rows.
    pub fn list(&self, cursor: Option<&str>, limit: u32) -> Result<Vec<Page>, CorpusError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, updated_at, title, text FROM pages
             WHERE ?1 IS NULL OR id > ?1
             ORDER BY id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![cursor, limit], page_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Total number of persisted pages.
    pub fn count(&self) -> Result<u64, CorpusError> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        updated_at: row.get(1)?,
        title: row.get(2)?,
        text: row.get(3)?,
    })
}
