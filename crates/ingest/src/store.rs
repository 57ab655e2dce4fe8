//! The bulk-ingester's SQLite-shaped demo database (spec.md §4.10, §6
//! "Demo DB"): `responses`, `corp_mappings`, `seed_progress`, `seed_meta`.
//!
//! A distinct schema from [`krfin_network::cache::disk::DiskCache`]'s
//! `cache` table — this one is keyed for checkpointing a crawl, not for
//! TTL-bounded request caching, even though both live in SQLite files.

use std::path::{Path, PathBuf};

use krfin_resolver::CorpMapping;
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ingest store database error at {path}: {source}")]
    Database {
        path: PathBuf,
        #[source]
        source: sqlx::Error,
    },
}

/// One row already written to `responses`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedProgress {
    pub companies_seen: i64,
    pub responses_written: i64,
}

pub struct Store {
    pool: SqlitePool,
    path: PathBuf,
}

impl Store {
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection or schema
    /// migration fails.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .map_err(|source| StoreError::Database { path: path.clone(), source })?;

        let store = Self { pool, path };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS responses (
                key TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                source TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS corp_mappings (
                corp_code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                ticker TEXT,
                modify_date TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS seed_progress (
                corp_code TEXT NOT NULL,
                report_code TEXT NOT NULL,
                year INTEGER NOT NULL,
                completed_at INTEGER NOT NULL,
                PRIMARY KEY (corp_code, report_code, year)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS seed_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;

        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn map_err(&self, source: sqlx::Error) -> StoreError {
        StoreError::Database { path: self.path.clone(), source }
    }

    /// Whether `(corp_code, report_code, year)` was already completed
    /// (spec.md §4.10 "Idempotence": seeded keys are skipped).
    pub async fn is_done(&self, corp_code: &str, report_code: &str, year: i32) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM seed_progress WHERE corp_code = ? AND report_code = ? AND year = ?")
            .bind(corp_code)
            .bind(report_code)
            .bind(year)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(row.is_some())
    }

    /// Upsert: overwriting a completed marker is safe (spec.md §4.10).
    pub async fn mark_done(&self, corp_code: &str, report_code: &str, year: i32, now_millis: i64) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seed_progress (corp_code, report_code, year, completed_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(corp_code, report_code, year) DO UPDATE SET completed_at = excluded.completed_at",
        )
        .bind(corp_code)
        .bind(report_code)
        .bind(year)
        .bind(now_millis)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    pub async fn save_response(&self, key: &str, data: &serde_json::Value, source: &str, now_millis: i64) -> Result<(), StoreError> {
        let payload = data.to_string();
        sqlx::query(
            "INSERT INTO responses (key, data, source, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET data = excluded.data, source = excluded.source, created_at = excluded.created_at",
        )
        .bind(key)
        .bind(payload)
        .bind(source)
        .bind(now_millis)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    pub async fn upsert_corp_mapping(&self, mapping: &CorpMapping) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO corp_mappings (corp_code, name, ticker, modify_date)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(corp_code) DO UPDATE SET name = excluded.name, ticker = excluded.ticker, modify_date = excluded.modify_date",
        )
        .bind(&mapping.corp_code)
        .bind(&mapping.corp_name)
        .bind(&mapping.stock_code)
        .bind(&mapping.modify_date)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    pub async fn set_meta(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seed_meta (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| self.map_err(e))?;
        Ok(())
    }

    pub async fn get_meta(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT value FROM seed_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?;
        row.map(|r| r.try_get("value").map_err(|e| self.map_err(e))).transpose()
    }

    /// Summary counters for `--status`.
    pub async fn progress(&self) -> Result<SeedProgress, StoreError> {
        let companies_seen: i64 = sqlx::query("SELECT COUNT(DISTINCT corp_code) AS n FROM seed_progress")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?
            .try_get("n")
            .map_err(|e| self.map_err(e))?;
        let responses_written: i64 = sqlx::query("SELECT COUNT(*) AS n FROM responses")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.map_err(e))?
            .try_get("n")
            .map_err(|e| self.map_err(e))?;
        Ok(SeedProgress { companies_seen, responses_written })
    }

    /// Clears every table (spec.md §6 `--reset`). The file itself is kept
    /// so a concurrent reader never sees a missing database.
    pub async fn reset(&self) -> Result<(), StoreError> {
        for table in ["responses", "corp_mappings", "seed_progress", "seed_meta"] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&self.pool)
                .await
                .map_err(|e| self.map_err(e))?;
        }
        Ok(())
    }
}
