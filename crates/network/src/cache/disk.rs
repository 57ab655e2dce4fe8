//! A persistent row-store cache (spec.md §4.3), backed by SQLite via
//! `sqlx`.
//!
//! This is a local, single-file, non-distributed store (no distributed
//! caching or multi-node coordination is in scope), so `sqlx`'s `sqlite`
//! feature is used rather than a server-backed engine. See `DESIGN.md`
//! for the dependency deviation note.

use std::path::{Path, PathBuf};

use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use super::CacheEntry;

#[derive(Debug, Error)]
pub enum DiskCacheError {
    #[error("disk cache database error at {path}: {source}")]
    Database {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}

/// Aggregate counters returned by [`DiskCache::stats`] (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entry_count: i64,
    pub total_hit_count: i64,
}

/// A SQLite-backed cache: `cache(key, value BLOB, created_at INT,
/// expires_at INT NULL, hit_count INT)`, exactly the schema in spec.md
/// §6 "Persisted state layout".
pub struct DiskCache {
    pool: SqlitePool,
    path: PathBuf,
}

impl DiskCache {
    /// Opens (creating if absent) the SQLite file at `path` and ensures
    /// the `cache` table exists.
    ///
    /// # Errors
    ///
    /// Returns [`DiskCacheError::Database`] if the connection or schema
    /// migration fails.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DiskCacheError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .map_err(|source| DiskCacheError::Database {
                path: path.clone(),
                source,
            })?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER,
                hit_count INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&pool)
        .await
        .map_err(|source| DiskCacheError::Database {
            path: path.clone(),
            source,
        })?;

        Ok(Self { pool, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_err(&self, source: sqlx::Error) -> DiskCacheError {
        DiskCacheError::Database {
            path: self.path.clone(),
            source,
        }
    }

    /// Returns the entry for `key` if present and unexpired as of
    /// `now_millis`, incrementing its hit counter. Expired entries are
    /// treated as absent but not deleted here; [`Self::prune`] reclaims
    /// them.
    pub async fn get(&self, key: &str, now_millis: i64) -> Result<Option<CacheEntry>, DiskCacheError> {
        let row = sqlx::query(
            "SELECT value, created_at, expires_at, hit_count FROM cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        let Some(row) = row else { return Ok(None) };
        let expires_at: Option<i64> = row.try_get("expires_at").map_err(|e| self.map_err(e))?;
        if let Some(expiry) = expires_at {
            if now_millis >= expiry {
                return Ok(None);
            }
        }

        sqlx::query("UPDATE cache SET hit_count = hit_count + 1 WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;

        let hit_count: i64 = row.try_get("hit_count").map_err(|e| self.map_err(e))?;
        Ok(Some(CacheEntry {
            value: row.try_get("value").map_err(|e| self.map_err(e))?,
            created_at_millis: row.try_get("created_at").map_err(|e| self.map_err(e))?,
            expires_at_millis: expires_at,
            hit_count: (hit_count + 1).max(0) as u64,
        }))
    }

    /// Whether `key` is present and unexpired, without affecting the hit
    /// counter.
    pub async fn has(&self, key: &str, now_millis: i64) -> Result<bool, DiskCacheError> {
        let row = sqlx::query("SELECT expires_at FROM cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(match row {
            None => false,
            Some(row) => {
                let expires_at: Option<i64> = row.try_get("expires_at").map_err(|e| self.map_err(e))?;
                expires_at.is_none_or(|expiry| now_millis < expiry)
            }
        })
    }

    /// Upserts `key`. Last-writer-wins on concurrent writes of the same
    /// key (spec.md §4.3).
    pub async fn set(
        &self,
        key: &str,
        value: &[u8],
        created_at_millis: i64,
        expires_at_millis: Option<i64>,
    ) -> Result<(), DiskCacheError> {
        sqlx::query(
            "INSERT INTO cache (key, value, created_at, expires_at, hit_count)
             VALUES (?, ?, ?, ?, 0)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(created_at_millis)
        .bind(expires_at_millis)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), DiskCacheError> {
        sqlx::query("DELETE FROM cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    /// Deletes every row whose key starts with `prefix`, returning the
    /// count removed.
    pub async fn invalidate_by_prefix(&self, prefix: &str) -> Result<u64, DiskCacheError> {
        let like_pattern = format!("{}%", escape_like(prefix));
        let result = sqlx::query("DELETE FROM cache WHERE key LIKE ? ESCAPE '\\'")
            .bind(like_pattern)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(result.rows_affected())
    }

    /// Removes all entries whose `expires_at` has passed as of
    /// `now_millis`. Permanent entries (`expires_at IS NULL`) are
    /// preserved.
    pub async fn prune(&self, now_millis: i64) -> Result<u64, DiskCacheError> {
        let result = sqlx::query("DELETE FROM cache WHERE expires_at IS NOT NULL AND expires_at <= ?")
            .bind(now_millis)
            .execute(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(result.rows_affected())
    }

    pub async fn stats(&self) -> Result<CacheStats, DiskCacheError> {
        let row = sqlx::query("SELECT COUNT(*) AS entry_count, COALESCE(SUM(hit_count), 0) AS total_hit_count FROM cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(CacheStats {
            entry_count: row.try_get("entry_count").map_err(|e| self.map_err(e))?,
            total_hit_count: row.try_get("total_hit_count").map_err(|e| self.map_err(e))?,
        })
    }
}

/// Escapes `%`, `_`, and `\` for use inside a `LIKE ... ESCAPE '\'` clause.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        cache.set("dart:company:1", b"payload", 1_000, None).await.unwrap();
        let entry = cache.get("dart:company:1", 2_000).await.unwrap().unwrap();
        assert_eq!(entry.value, b"payload");
        assert_eq!(entry.hit_count, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_expired_entry_is_absent_but_not_deleted() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        cache.set("k", b"v", 1_000, Some(2_000)).await.unwrap();
        assert!(cache.get("k", 3_000).await.unwrap().is_none());
        assert!(!cache.has("k", 3_000).await.unwrap());

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_prune_removes_only_expired() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        cache.set("expired", b"v", 1_000, Some(2_000)).await.unwrap();
        cache.set("permanent", b"v", 1_000, None).await.unwrap();
        let removed = cache.prune(3_000).await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.has("permanent", 3_000).await.unwrap());
        assert!(!cache.has("expired", 3_000).await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_invalidate_by_prefix_counts_removed() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        cache.set("dart:company:1", b"v", 1_000, None).await.unwrap();
        cache.set("dart:company:2", b"v", 1_000, None).await.unwrap();
        cache.set("dart:filing:1", b"v", 1_000, None).await.unwrap();
        let removed = cache.invalidate_by_prefix("dart:company").await.unwrap();
        assert_eq!(removed, 2);
        assert!(cache.has("dart:filing:1", 2_000).await.unwrap());
    }

    #[rstest]
    #[tokio::test]
    async fn test_upsert_is_last_writer_wins() {
        let dir = tempdir().unwrap();
        let cache = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        cache.set("k", b"first", 1_000, None).await.unwrap();
        cache.set("k", b"second", 1_500, None).await.unwrap();
        let entry = cache.get("k", 2_000).await.unwrap().unwrap();
        assert_eq!(entry.value, b"second");
    }
}
