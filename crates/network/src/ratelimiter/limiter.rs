//! Composes the per-second and per-minute in-memory [`Bucket`]s with the
//! disk-persisted [`DailyQuota`] into the single `acquire` contract
//! spec.md §4.1 describes.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;

use krfin_core::{consts::DEFAULT_RATE_LIMIT_RETRY_ROUNDS, time::Clock};

use super::{
    daily::{DailyQuota, DailyQuotaError},
    quota::{Bucket, Quota},
};

/// The three rates a provider is configured with (spec.md §4.1 table).
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub per_second: u32,
    pub per_minute: u32,
    pub per_day: u64,
}

#[derive(Debug, Error)]
pub enum AcquireError {
    /// The daily budget is exhausted. Non-retryable.
    #[error(transparent)]
    DailyExhausted(#[from] DailyQuotaError),
    /// Per-second/per-minute starvation exceeded the retry bound; the
    /// caller surfaces this as `RateLimited` (retryable) per spec.md
    /// §4.1.
    #[error("rate limiter retry budget exhausted after {rounds} rounds")]
    RetryExhausted { rounds: u32 },
}

/// Snapshot returned by [`RateLimiter::status`] (spec.md §4.1 "Budget alerts").
#[derive(Debug, Clone, Copy)]
pub struct RateStatus {
    pub used: u64,
    pub remaining: u64,
    pub percent: f64,
    pub near_limit: bool,
}

/// A per-provider rate limiter: two in-memory buckets plus a
/// disk-persisted daily counter, all serialized behind one mutex for the
/// daily counter's cross-tier bookkeeping.
pub struct RateLimiter<C: Clock> {
    per_second: Bucket,
    per_minute: Bucket,
    daily: Mutex<DailyQuota>,
    clock: C,
    retry_rounds: u32,
}

impl<C: Clock> RateLimiter<C> {
    /// Builds a limiter, loading (or initializing) the persisted daily
    /// counter at `daily_quota_path`.
    ///
    /// # Errors
    ///
    /// Returns [`DailyQuotaError`] if the persisted file exists but is
    /// unreadable/corrupt.
    pub fn new(
        config: RateLimiterConfig,
        daily_quota_path: impl Into<std::path::PathBuf>,
        clock: C,
    ) -> Result<Self, DailyQuotaError> {
        let now = clock.now_utc();
        let daily = DailyQuota::load(daily_quota_path, config.per_day, now)?;
        Ok(Self {
            per_second: Bucket::new(Quota::per_second(config.per_second)),
            per_minute: Bucket::new(Quota::per_minute(config.per_minute)),
            daily: Mutex::new(daily),
            clock,
            retry_rounds: DEFAULT_RATE_LIMIT_RETRY_ROUNDS,
        })
    }

    /// Admits one request, blocking (bounded) for in-memory bucket
    /// refill, then consuming one unit of the persisted daily budget.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::DailyExhausted`] if the daily budget is spent
    ///   (fails fast, non-retryable).
    /// - [`AcquireError::RetryExhausted`] if per-second/per-minute
    ///   starvation persists past `retry_rounds` bounded waits.
    pub async fn acquire(&self) -> Result<u64, AcquireError> {
        for round in 0..self.retry_rounds {
            let now = self.clock.monotonic_now();
            if self.per_minute.try_acquire_at(now).await {
                if self.per_second.try_acquire_at(now).await {
                    let mut daily = self.daily.lock().await;
                    return Ok(daily.acquire(self.clock.now_utc())?);
                }
                // Per-minute token spent but per-second denied: wait out
                // the (short) per-second interval only.
                let wait = self.per_second.wait_hint(now).await;
                tokio::time::sleep(capped(wait, round)).await;
                continue;
            }
            // Per-minute bucket empty: wait is capped at one retry
            // interval so a 60s per-minute refill can never produce a
            // pathological stall (spec.md §9 "follow the capped behavior").
            let wait = self.per_minute.wait_hint(now).await;
            tokio::time::sleep(capped(wait, round)).await;
        }
        Err(AcquireError::RetryExhausted {
            rounds: self.retry_rounds,
        })
    }

    /// Reports current daily-budget status without consuming a token.
    pub async fn status(&self) -> RateStatus {
        let daily = self.daily.lock().await;
        RateStatus {
            used: daily.used(),
            remaining: daily.remaining(),
            percent: daily.percent_used(),
            near_limit: daily.near_limit(),
        }
    }
}

/// Caps a computed wait at a fixed per-retry-round interval, and applies
/// a small amount of jitter so many concurrent callers don't thunder-herd
/// on the same refill tick.
fn capped(wait: Duration, round: u32) -> Duration {
    const RETRY_INTERVAL_CAP: Duration = Duration::from_millis(250);
    let base = wait.min(RETRY_INTERVAL_CAP);
    let jitter_ms = u64::from(round % 5);
    base + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;
    use tempfile::tempdir;

    use krfin_core::time::StaticClock;

    use super::*;

    fn clock() -> StaticClock {
        StaticClock::new(Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap())
    }

    #[rstest]
    #[tokio::test]
    async fn test_acquire_within_burst_succeeds() {
        let dir = tempdir().unwrap();
        let config = RateLimiterConfig {
            per_second: 5,
            per_minute: 100,
            per_day: 1000,
        };
        let limiter = RateLimiter::new(config, dir.path().join("dart.json"), clock()).unwrap();
        for _ in 0..5 {
            assert!(limiter.acquire().await.is_ok());
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_daily_exhaustion_fails_fast() {
        let dir = tempdir().unwrap();
        let config = RateLimiterConfig {
            per_second: 100,
            per_minute: 100,
            per_day: 2,
        };
        let limiter = RateLimiter::new(config, dir.path().join("dart.json"), clock()).unwrap();
        assert!(limiter.acquire().await.is_ok());
        assert!(limiter.acquire().await.is_ok());
        let err = limiter.acquire().await.unwrap_err();
        assert!(matches!(err, AcquireError::DailyExhausted(_)));

        let status = limiter.status().await;
        assert_eq!(status.remaining, 0);
        assert!((status.percent - 100.0).abs() < f64::EPSILON);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn test_per_second_starvation_eventually_retries_out_or_succeeds() {
        let dir = tempdir().unwrap();
        let config = RateLimiterConfig {
            per_second: 1,
            per_minute: 100,
            per_day: 1000,
        };
        let limiter = RateLimiter::new(config, dir.path().join("dart.json"), clock()).unwrap();
        assert!(limiter.acquire().await.is_ok());
        // Second call must wait for per-second refill; with paused time
        // and auto-advance, tokio will fast-forward through the sleep.
        assert!(limiter.acquire().await.is_ok());
    }
}
