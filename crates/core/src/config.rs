//! Per-user config-directory layout (spec.md §6 "Persisted state layout").
//!
//! All persisted state — rate-limit counters, cache databases, the KIS
//! token file, the corp-code mapping — lives under one root directory so
//! a single `--reset`/backup operation covers everything.

use std::path::{Path, PathBuf};

use crate::provider::Provider;

/// Resolves and exposes the paths for every file `krfin` persists.
#[derive(Debug, Clone)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// Resolves the default config directory: `dirs::config_dir()/krfin`,
    /// falling back to `./.krfin` when no home/config directory is
    /// resolvable (e.g. a minimal container or CI sandbox).
    #[must_use]
    pub fn resolve() -> Self {
        let root = dirs::config_dir()
            .map(|d| d.join("krfin"))
            .unwrap_or_else(|| PathBuf::from(".krfin"));
        Self { root }
    }

    /// Uses an explicit root directory, e.g. for tests (`tempfile`).
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Ensures the root directory (and the `rate-limits` subdirectory)
    /// exist. Idempotent.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.rate_limits_dir())
    }

    #[must_use]
    pub fn rate_limits_dir(&self) -> PathBuf {
        self.root.join("rate-limits")
    }

    /// `rate-limits/<provider>.json`.
    #[must_use]
    pub fn rate_limit_file(&self, provider: Provider) -> PathBuf {
        self.rate_limits_dir().join(format!("{}.json", provider.slug()))
    }

    /// `<provider>-cache.sqlite`.
    #[must_use]
    pub fn disk_cache_file(&self, provider: Provider) -> PathBuf {
        self.root.join(format!("{}-cache.sqlite", provider.slug()))
    }

    /// `kis-token.json`.
    #[must_use]
    pub fn kis_token_file(&self) -> PathBuf {
        self.root.join("kis-token.json")
    }

    /// `corp-codes.json`.
    #[must_use]
    pub fn corp_codes_file(&self) -> PathBuf {
        self.root.join("corp-codes.json")
    }

    /// The bulk-ingester demo database, default location
    /// (overridable via `--output`).
    #[must_use]
    pub fn ingest_db_file(&self) -> PathBuf {
        self.root.join("ingest.sqlite")
    }
}
