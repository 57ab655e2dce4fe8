//! The civil-day (UTC+9) persisted quota counter.
//!
//! Persists to `rate-limits/<provider>.json` after every successful
//! acquisition (spec.md §4.1/§6). Two sibling processes racing on the
//! same file produce last-writer-wins under-counting bounded by the
//! concurrency level — accepted per spec.md §5, since daily budgets have
//! headroom.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use krfin_core::time::next_kst_midnight;

/// The persisted shape of `rate-limits/<provider>.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyQuotaState {
    #[serde(rename = "dailyUsed")]
    pub daily_used: u64,
    #[serde(rename = "resetAt")]
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DailyQuotaError {
    #[error("daily quota of {limit} exhausted; resets at {reset_at}")]
    Exhausted { limit: u64, reset_at: DateTime<Utc> },
    #[error("failed to read/write daily quota file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse daily quota file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A disk-backed daily counter bounded at `limit`, resetting at the next
/// KST midnight.
pub struct DailyQuota {
    path: PathBuf,
    limit: u64,
    state: DailyQuotaState,
}

impl DailyQuota {
    /// Loads the counter from `path` if present and not yet past its
    /// `reset_at`; otherwise starts a fresh counter.
    ///
    /// # Errors
    ///
    /// Returns [`DailyQuotaError::Io`]/[`DailyQuotaError::Parse`] if the
    /// file exists but cannot be read or parsed.
    pub fn load(path: impl Into<PathBuf>, limit: u64, now: DateTime<Utc>) -> Result<Self, DailyQuotaError> {
        let path = path.into();
        let state = match std::fs::read(&path) {
            Ok(bytes) => {
                let loaded: DailyQuotaState = serde_json::from_slice(&bytes).map_err(|source| {
                    DailyQuotaError::Parse {
                        path: path.clone(),
                        source,
                    }
                })?;
                if loaded.reset_at <= now {
                    Self::fresh_state(now)
                } else {
                    loaded
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::fresh_state(now),
            Err(source) => {
                return Err(DailyQuotaError::Io {
                    path,
                    source,
                })
            }
        };
        Ok(Self { path, limit, state })
    }

    fn fresh_state(now: DateTime<Utc>) -> DailyQuotaState {
        DailyQuotaState {
            daily_used: 0,
            reset_at: next_kst_midnight(now),
        }
    }

    /// Rolls the counter over to a fresh window if `now` is at or past
    /// `reset_at`.
    fn roll_if_expired(&mut self, now: DateTime<Utc>) {
        if now >= self.state.reset_at {
            self.state = Self::fresh_state(now);
        }
    }

    /// Attempts to consume one unit of the daily budget, persisting the
    /// new counter to disk on success.
    ///
    /// # Errors
    ///
    /// Returns [`DailyQuotaError::Exhausted`] (non-retryable per spec.md
    /// §4.1 "fails fast") if the daily budget is already spent, or an IO
    /// error if the write-through fails.
    pub fn acquire(&mut self, now: DateTime<Utc>) -> Result<u64, DailyQuotaError> {
        self.roll_if_expired(now);
        if self.state.daily_used >= self.limit {
            return Err(DailyQuotaError::Exhausted {
                limit: self.limit,
                reset_at: self.state.reset_at,
            });
        }
        self.state.daily_used += 1;
        self.persist()?;
        Ok(self.limit - self.state.daily_used)
    }

    fn persist(&self) -> Result<(), DailyQuotaError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DailyQuotaError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        let bytes = serde_json::to_vec_pretty(&self.state).expect("DailyQuotaState always serializes");
        std::fs::write(&self.path, bytes).map_err(|source| DailyQuotaError::Io {
            path: self.path.clone(),
            source,
        })
    }

    #[must_use]
    pub const fn used(&self) -> u64 {
        self.state.daily_used
    }

    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.state.daily_used)
    }

    #[must_use]
    pub fn percent_used(&self) -> f64 {
        if self.limit == 0 {
            100.0
        } else {
            (self.state.daily_used as f64 / self.limit as f64) * 100.0
        }
    }

    /// True when more than 80% of the daily budget has been consumed
    /// (spec.md §4.1 "Budget alerts").
    #[must_use]
    pub fn near_limit(&self) -> bool {
        self.percent_used() > 80.0
    }

    #[must_use]
    pub const fn reset_at(&self) -> DateTime<Utc> {
        self.state.reset_at
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;
    use tempfile::tempdir;

    use super::*;

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, h, 0, 0).unwrap()
    }

    #[rstest]
    fn test_fresh_quota_starts_at_zero() {
        let dir = tempdir().unwrap();
        let quota = DailyQuota::load(dir.path().join("dart.json"), 2, t(0)).unwrap();
        assert_eq!(quota.used(), 0);
        assert_eq!(quota.remaining(), 2);
    }

    #[rstest]
    fn test_acquire_persists_and_survives_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dart.json");
        let mut quota = DailyQuota::load(&path, 5, t(0)).unwrap();
        quota.acquire(t(0)).unwrap();
        quota.acquire(t(1)).unwrap();
        assert_eq!(quota.used(), 2);

        let reloaded = DailyQuota::load(&path, 5, t(2)).unwrap();
        assert_eq!(reloaded.used(), 2);
    }

    #[rstest]
    fn test_exhaustion_is_non_retryable_by_classification() {
        let dir = tempdir().unwrap();
        let mut quota = DailyQuota::load(dir.path().join("dart.json"), 2, t(0)).unwrap();
        quota.acquire(t(0)).unwrap();
        quota.acquire(t(1)).unwrap();
        let err = quota.acquire(t(2)).unwrap_err();
        assert!(matches!(err, DailyQuotaError::Exhausted { limit: 2, .. }));
    }

    #[rstest]
    fn test_rolls_over_at_kst_midnight() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dart.json");
        let mut quota = DailyQuota::load(&path, 1, t(0)).unwrap();
        quota.acquire(t(0)).unwrap();
        assert_eq!(quota.remaining(), 0);

        // t(0) is 2026-07-28 09:00 KST; the next KST midnight is 2026-07-28 15:00 UTC.
        // t(16) is past that boundary.
        let reloaded = DailyQuota::load(&path, 1, t(16)).unwrap();
        assert_eq!(reloaded.used(), 0);
    }

    #[rstest]
    fn test_near_limit_threshold() {
        let dir = tempdir().unwrap();
        let mut quota = DailyQuota::load(dir.path().join("dart.json"), 10, t(0)).unwrap();
        for h in 0..8 {
            quota.acquire(t(h % 14)).unwrap();
        }
        assert!(quota.near_limit());
    }
}
