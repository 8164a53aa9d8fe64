//! Durable (album, fingerprint) → filenames index.
//!
//! Backed by SQLite through an sqlx pool in WAL mode. The pool may be shared
//! across concurrent upload tasks; every write runs in its own transaction.
//! A duplicate-check racing a concurrent insert for the same fingerprint can
//! at worst produce one redundant record, never corruption.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{DedupError, Result};
use crate::fingerprint::ContentFingerprint;

/// Structural version of the `images` table. Bump on any schema change.
pub const SCHEMA_VERSION: i64 = 1;

/// Opaque key identifying a remote album. Supplied by the caller, never
/// generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlbumKey(String);

impl AlbumKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlbumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One known image: content digest plus the filename it was seen under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    /// Lowercase hex MD5 of the image content
    pub digest_hex: String,
    /// Filename the content is known under in the album
    pub filename: String,
}

/// Persistent deduplication store.
pub struct DedupStore {
    pool: SqlitePool,
}

impl DedupStore {
    /// Open (creating if necessary) the store at `path`.
    ///
    /// A freshly created database records [`SCHEMA_VERSION`]; an existing one
    /// is validated against it and refused with
    /// [`DedupError::VersionMismatch`] on disagreement.
    pub async fn open(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!(path = %path.display(), "opened dedup store");
        Self::initialize(&pool).await?;
        Ok(Self { pool })
    }

    /// Open an in-memory store, used by tests.
    ///
    /// Limited to a single connection: each SQLite `:memory:` connection is
    /// its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Self::initialize(&pool).await?;
        Ok(Self { pool })
    }

    /// Close the underlying pool, flushing outstanding writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables on a fresh database, or validate the recorded schema
    /// version on an existing one.
    async fn initialize(pool: &SqlitePool) -> Result<()> {
        let has_versions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_versions'",
        )
        .fetch_one(pool)
        .await?;

        if has_versions == 0 {
            debug!("creating dedup store schema");
            let mut tx = pool.begin().await?;

            sqlx::query(
                r#"
                CREATE TABLE images (
                    id INTEGER NOT NULL PRIMARY KEY,
                    album_key TEXT NOT NULL,
                    hash TEXT NOT NULL,
                    size INTEGER,
                    filename TEXT NOT NULL
                )
                "#,
            )
            .execute(&mut *tx)
            .await?;

            sqlx::query("CREATE INDEX images_hash_index ON images (hash)")
                .execute(&mut *tx)
                .await?;
            sqlx::query("CREATE INDEX images_album_key_index ON images (album_key)")
                .execute(&mut *tx)
                .await?;

            sqlx::query("CREATE TABLE schema_versions (name TEXT NOT NULL, version INTEGER NOT NULL)")
                .execute(&mut *tx)
                .await?;
            sqlx::query("INSERT INTO schema_versions (name, version) VALUES ('images', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            return Ok(());
        }

        let found: Option<i64> =
            sqlx::query_scalar("SELECT version FROM schema_versions WHERE name = 'images'")
                .fetch_optional(pool)
                .await?;

        match found {
            Some(version) if version == SCHEMA_VERSION => Ok(()),
            Some(version) => Err(DedupError::VersionMismatch {
                found: version,
                expected: SCHEMA_VERSION,
            }),
            None => Err(DedupError::VersionMismatch {
                found: 0,
                expected: SCHEMA_VERSION,
            }),
        }
    }

    /// Record one successful upload.
    ///
    /// A failure here is a local bookkeeping failure: the remote upload has
    /// already happened, so the caller reports it but does not retry.
    pub async fn record_upload(
        &self,
        album: &AlbumKey,
        fingerprint: &ContentFingerprint,
        filename: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO images (album_key, hash, size, filename) VALUES (?, ?, ?, ?)")
            .bind(album.as_str())
            .bind(fingerprint.digest_hex())
            .bind(fingerprint.size() as i64)
            .bind(filename)
            .execute(&self.pool)
            .await?;

        debug!(album = %album, filename, "recorded upload");
        Ok(())
    }

    /// Bulk-record images reported by a remote listing, in one transaction.
    ///
    /// The remote listing carries no size, so those rows store NULL there;
    /// duplicate matching is by digest alone.
    pub async fn record_images(&self, album: &AlbumKey, entries: &[ImageEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for entry in entries {
            sqlx::query("INSERT INTO images (album_key, hash, size, filename) VALUES (?, ?, NULL, ?)")
                .bind(album.as_str())
                .bind(entry.digest_hex.to_ascii_lowercase())
                .bind(&entry.filename)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        debug!(album = %album, count = entries.len(), "recorded remote images");
        Ok(())
    }

    /// All filenames previously recorded for this (album, fingerprint) pair.
    /// An empty result means "not a known duplicate", not an error.
    pub async fn find_duplicates(
        &self,
        album: &AlbumKey,
        fingerprint: &ContentFingerprint,
    ) -> Result<Vec<String>> {
        let filenames: Vec<String> =
            sqlx::query_scalar("SELECT filename FROM images WHERE album_key = ? AND hash = ?")
                .bind(album.as_str())
                .bind(fingerprint.digest_hex())
                .fetch_all(&self.pool)
                .await?;

        Ok(filenames)
    }

    /// Delete every record for the album. All or nothing: on failure the
    /// store is unchanged and the error surfaces.
    pub async fn clear_album(&self, album: &AlbumKey) -> Result<()> {
        let result = sqlx::query("DELETE FROM images WHERE album_key = ?")
            .bind(album.as_str())
            .execute(&self.pool)
            .await?;

        debug!(album = %album, removed = result.rows_affected(), "cleared album records");
        Ok(())
    }

    /// Replace the album's records with a fresh remote listing, in a single
    /// transaction so a truth refresh can never leave the album half-synced.
    pub async fn replace_album(&self, album: &AlbumKey, entries: &[ImageEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM images WHERE album_key = ?")
            .bind(album.as_str())
            .execute(&mut *tx)
            .await?;

        for entry in entries {
            sqlx::query("INSERT INTO images (album_key, hash, size, filename) VALUES (?, ?, NULL, ?)")
                .bind(album.as_str())
                .bind(entry.digest_hex.to_ascii_lowercase())
                .bind(&entry.filename)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(album = %album, count = entries.len(), "replaced album records");
        Ok(())
    }

    /// Number of records held for the album.
    pub async fn album_record_count(&self, album: &AlbumKey) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images WHERE album_key = ?")
            .bind(album.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }
}
