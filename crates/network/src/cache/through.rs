//! Orchestrates memory → disk → origin lookup with write-back (spec.md
//! §4.4), and the canonical cache-key builder every provider client uses.

use std::future::Future;
use std::time::Duration;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::Mutex;

use krfin_core::{Provider, time::Clock};

use super::{DiskCache, DiskCacheError, LruMemoryCache};

/// Parameter names that never participate in cache-key construction,
/// since rotating credentials must not invalidate the cache (spec.md
/// §4.4).
const AUTH_PARAM_NAMES: &[&str] = &[
    "crtfc_key",
    "apiKey",
    "api_key",
    "appkey",
    "appsecret",
    "tr_id",
    "authorization",
    "token",
];

/// Builds a canonical cache key: `<provider>:<endpoint>:<fingerprint>`.
/// Parameter order never affects the result, and auth-bearing parameters
/// are excluded (spec.md §4.4).
#[must_use]
pub fn build_key(provider: Provider, endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<&(&str, &str)> = params
        .iter()
        .filter(|(k, _)| !AUTH_PARAM_NAMES.contains(k))
        .collect();
    pairs.sort_by_key(|(k, _)| *k);

    let mut hasher = Sha256::new();
    for (k, v) in pairs {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"&");
    }
    let digest = hasher.finalize();
    let mut fingerprint = String::with_capacity(digest.len() * 2);
    for byte in digest {
        fingerprint.push_str(&format!("{byte:02x}"));
    }
    format!("{}:{}:{}", provider.slug(), endpoint, fingerprint)
}

/// Which tier satisfied a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Memory,
    Disk,
    Origin,
}

#[derive(Debug, Error)]
pub enum FetchError<E> {
    #[error(transparent)]
    Disk(#[from] DiskCacheError),
    #[error(transparent)]
    Origin(E),
}

/// Composes an [`LruMemoryCache`] and a [`DiskCache`] into the full
/// memory → disk → origin lookup chain.
pub struct CacheThrough {
    memory: Mutex<LruMemoryCache>,
    disk: DiskCache,
}

impl CacheThrough {
    #[must_use]
    pub fn new(disk: DiskCache, memory_capacity: usize) -> Self {
        Self {
            memory: Mutex::new(LruMemoryCache::new(memory_capacity)),
            disk,
        }
    }

    /// Resolves `key`, following spec.md §4.4's three-step lookup:
    /// memory, then disk (writing through to memory if `ttl` is
    /// positive), then `origin` (writing through to disk always, and to
    /// memory if `ttl` is positive).
    ///
    /// `force_refresh` bypasses both cache tiers but still writes
    /// through on success. `ttl` of `None` means "permanent": stored
    /// only on disk, never time-expires.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Disk`] if the disk tier fails, or
    /// [`FetchError::Origin`] if `origin` fails (in which case nothing
    /// is written to either tier).
    pub async fn fetch<F, Fut, E>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        force_refresh: bool,
        clock: &dyn Clock,
        origin: F,
    ) -> Result<(Vec<u8>, Provenance), FetchError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, E>>,
    {
        let monotonic_now = clock.monotonic_now();
        let civil_now_millis = clock.now_utc().timestamp_millis();
        let positive_ttl = ttl.filter(|d| !d.is_zero());

        if !force_refresh {
            {
                let mut memory = self.memory.lock().await;
                if let Some(value) = memory.get(key, monotonic_now) {
                    return Ok((value, Provenance::Memory));
                }
            }

            if let Some(entry) = self.disk.get(key, civil_now_millis).await? {
                if let Some(ttl) = positive_ttl {
                    let mut memory = self.memory.lock().await;
                    memory.put(key.to_string(), entry.value.clone(), Some(ttl), monotonic_now);
                }
                return Ok((entry.value, Provenance::Disk));
            }
        }

        let value = origin().await.map_err(FetchError::Origin)?;

        let expires_at_millis = positive_ttl.map(|ttl| civil_now_millis + ttl.as_millis() as i64);
        self.disk
            .set(key, &value, civil_now_millis, expires_at_millis)
            .await?;
        if let Some(ttl) = positive_ttl {
            let mut memory = self.memory.lock().await;
            memory.put(key.to_string(), value.clone(), Some(ttl), monotonic_now);
        }

        Ok((value, Provenance::Origin))
    }

    pub async fn invalidate_by_prefix(&self, prefix: &str) -> Result<u64, DiskCacheError> {
        let mut memory = self.memory.lock().await;
        memory.invalidate_by_prefix(prefix);
        self.disk.invalidate_by_prefix(prefix).await
    }

    #[must_use]
    pub fn disk(&self) -> &DiskCache {
        &self.disk
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use krfin_core::{Provider, time::StaticClock};
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    #[rstest]
    fn test_build_key_is_order_independent() {
        let a = build_key(Provider::Dart, "company", &[("b", "2"), ("a", "1"), ("c", "3")]);
        let b = build_key(Provider::Dart, "company", &[("c", "3"), ("a", "1"), ("b", "2")]);
        assert_eq!(a, b);
    }

    #[rstest]
    fn test_build_key_excludes_auth_params() {
        let a = build_key(Provider::Dart, "company", &[("a", "1"), ("crtfc_key", "secret1")]);
        let b = build_key(Provider::Dart, "company", &[("a", "1"), ("crtfc_key", "secret2")]);
        assert_eq!(a, b);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cold_warm_forced_refresh() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        let through = CacheThrough::new(disk, 10);
        let clock = StaticClock::new(Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap());

        let calls = std::sync::atomic::AtomicUsize::new(0);
        let origin = || async {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>(b"payload".to_vec())
        };

        let (_, prov) = through
            .fetch("dart:company:abc", Some(Duration::from_secs(60)), false, &clock, origin)
            .await
            .unwrap();
        assert_eq!(prov, Provenance::Origin);

        let (_, prov) = through
            .fetch("dart:company:abc", Some(Duration::from_secs(60)), false, &clock, origin)
            .await
            .unwrap();
        assert_eq!(prov, Provenance::Memory);

        through.invalidate_by_prefix("dart:company").await.unwrap();

        let (_, prov) = through
            .fetch("dart:company:abc", Some(Duration::from_secs(60)), false, &clock, origin)
            .await
            .unwrap();
        assert_eq!(prov, Provenance::Origin);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[rstest]
    #[tokio::test]
    async fn test_null_ttl_never_populates_memory() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        let through = CacheThrough::new(disk, 10);
        let clock = StaticClock::new(Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap());

        let origin = || async { Ok::<_, std::convert::Infallible>(b"permanent".to_vec()) };
        let (_, prov) = through.fetch("dart:filing:1", None, false, &clock, origin).await.unwrap();
        assert_eq!(prov, Provenance::Origin);

        // A second lookup must skip memory (never populated) and hit disk.
        let (_, prov) = through.fetch("dart:filing:1", None, false, &clock, origin).await.unwrap();
        assert_eq!(prov, Provenance::Disk);
    }

    #[rstest]
    #[tokio::test]
    async fn test_force_refresh_bypasses_both_tiers() {
        let dir = tempdir().unwrap();
        let disk = DiskCache::open(dir.path().join("dart-cache.sqlite")).await.unwrap();
        let through = CacheThrough::new(disk, 10);
        let clock = StaticClock::new(Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap());

        let origin = || async { Ok::<_, std::convert::Infallible>(b"v1".to_vec()) };
        through.fetch("k", Some(Duration::from_secs(60)), false, &clock, origin).await.unwrap();

        let origin2 = || async { Ok::<_, std::convert::Infallible>(b"v2".to_vec()) };
        let (value, prov) = through.fetch("k", Some(Duration::from_secs(60)), true, &clock, origin2).await.unwrap();
        assert_eq!(prov, Provenance::Origin);
        assert_eq!(value, b"v2");
    }
}
