//! Database operations for the archive digest cache

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::Result;
use crate::schema::{CREATE_SCHEMA, SCHEMA_VERSION};

/// SQLite-backed digest cache.
///
/// Two tables, both keyed by archive identity: one for md5 digests and one
/// for sha256 digests. An archive is considered cached only when it is
/// present in both.
pub struct DigestCache {
    conn: Connection,
}

impl DigestCache {
    /// Open or create a digest cache database
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create an in-memory cache (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    fn initialize(&self) -> Result<()> {
        let needs_init: bool = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_info'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|count| count == 0)?;

        if needs_init {
            self.conn.execute_batch(CREATE_SCHEMA)?;
            self.conn.execute(
                "INSERT INTO schema_info (version, description) VALUES (?1, ?2)",
                params![SCHEMA_VERSION, "Initial schema"],
            )?;
            tracing::debug!("initialized digest cache schema v{}", SCHEMA_VERSION);
        }

        Ok(())
    }

    /// Get the cached md5 digest for an archive
    pub fn get_md5(&self, archive: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                "SELECT digest FROM md5_digests WHERE archive = ?1",
                params![archive],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Get the cached sha256 digest for an archive
    pub fn get_sha256(&self, archive: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row(
                "SELECT digest FROM sha256_digests WHERE archive = ?1",
                params![archive],
                |row| row.get(0),
            )
            .optional()?;
        Ok(result)
    }

    /// Insert both digests for an archive in one transaction
    pub fn insert(&mut self, archive: &str, md5: &str, sha256: &str) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO md5_digests (archive, digest) VALUES (?1, ?2)",
            params![archive, md5],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO sha256_digests (archive, digest) VALUES (?1, ?2)",
            params![archive, sha256],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Number of fully cached archives
    pub fn len(&self) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM md5_digests m
             JOIN sha256_digests s ON m.archive = s.archive",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Whether no archive has been fully cached yet
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
