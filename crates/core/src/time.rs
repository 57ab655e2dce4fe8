//! Two time notions, deliberately kept apart: civil time in a fixed
//! UTC+9 offset (for daily-quota resets and market-hours checks), and
//! monotonic time (for TTL comparisons and token-bucket refill).
//!
//! Mixing the two is the classic source of clock-skew bugs in rate
//! limiters: a wall-clock adjustment (NTP step, DST — not applicable to
//! KST, but the principle holds) must never perturb a TTL computed
//! against [`std::time::Instant`].

use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};

/// The fixed UTC+9 offset used for all civil-day and market-hours logic.
#[must_use]
pub fn kst_offset() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("9 hours is a valid fixed offset")
}

/// Converts a UTC instant to its KST civil representation.
#[must_use]
pub fn to_kst(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    instant.with_timezone(&kst_offset())
}

/// Returns the next KST midnight strictly after `now`.
///
/// Used by the rate limiter's daily-quota reset and by quota-exhaustion
/// error messages ("wait until midnight KST").
#[must_use]
pub fn next_kst_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let kst_now = to_kst(now);
    let next_midnight_kst = (kst_now.date_naive() + chrono::Days::new(1))
        .and_time(NaiveTime::MIN);
    kst_offset()
        .from_local_datetime(&next_midnight_kst)
        .single()
        .expect("fixed-offset local datetime is always unambiguous")
        .with_timezone(&Utc)
}

/// Whether `now` falls within Mon–Fri 09:00–15:30 KST, the Korean equity
/// market's regular session.
#[must_use]
pub fn is_market_open(now: DateTime<Utc>) -> bool {
    let kst_now = to_kst(now);
    if matches!(kst_now.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    let open = NaiveTime::from_hms_opt(9, 0, 0).expect("valid time");
    let close = NaiveTime::from_hms_opt(15, 30, 0).expect("valid time");
    let t = kst_now.time();
    t >= open && t <= close
}

/// A source of both civil (wall-clock) and monotonic time.
///
/// Abstracted behind a trait so tests can inject a fixed/advancing clock
/// instead of `std`/`chrono`'s real clocks.
pub trait Clock: Send + Sync {
    /// The current civil instant, UTC.
    fn now_utc(&self) -> DateTime<Utc>;
    /// The current monotonic instant, for TTL/refill math only.
    fn monotonic_now(&self) -> Instant;
}

/// The real, system-backed clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually-advanced clock for deterministic tests of TTL/rate-limiter
/// behavior, avoiding real `sleep()` calls in the test suite.
#[derive(Debug, Clone)]
pub struct StaticClock {
    utc: std::sync::Arc<std::sync::Mutex<DateTime<Utc>>>,
    monotonic: std::sync::Arc<std::sync::Mutex<Instant>>,
}

impl StaticClock {
    #[must_use]
    pub fn new(start_utc: DateTime<Utc>) -> Self {
        Self {
            utc: std::sync::Arc::new(std::sync::Mutex::new(start_utc)),
            monotonic: std::sync::Arc::new(std::sync::Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.utc.lock().expect("clock mutex poisoned") += duration;
        // Instant has no public "add and store back" without overflow concerns
        // in tests, but std Instant + Duration is safe for our bounded advances.
        let mut mono = self.monotonic.lock().expect("clock mutex poisoned");
        *mono += duration;
    }
}

impl Clock for StaticClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.utc.lock().expect("clock mutex poisoned")
    }

    fn monotonic_now(&self) -> Instant {
        *self.monotonic.lock().expect("clock mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_next_kst_midnight_same_day() {
        // 2026-07-28 10:00 UTC == 2026-07-28 19:00 KST
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 10, 0, 0).unwrap();
        let next = next_kst_midnight(now);
        let next_kst = to_kst(next);
        assert_eq!(next_kst.time(), NaiveTime::MIN);
        assert_eq!(next_kst.date_naive(), to_kst(now).date_naive().succ_opt().unwrap());
    }

    #[rstest]
    fn test_next_kst_midnight_just_before_rollover() {
        // 2026-07-28 14:59:59 UTC == 2026-07-28 23:59:59 KST
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 14, 59, 59).unwrap();
        let next = next_kst_midnight(now);
        assert!(next > now);
        assert!(next - now < chrono::Duration::seconds(2));
    }

    #[rstest]
    fn test_market_open_weekday_during_hours() {
        // 2026-07-28 is a Tuesday. 02:00 UTC == 11:00 KST.
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 2, 0, 0).unwrap();
        assert!(is_market_open(now));
    }

    #[rstest]
    fn test_market_closed_weekend() {
        // 2026-08-01 is a Saturday.
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 2, 0, 0).unwrap();
        assert!(!is_market_open(now));
    }

    #[rstest]
    fn test_market_closed_after_hours() {
        // 07:00 UTC == 16:00 KST, after the 15:30 close.
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 7, 0, 0).unwrap();
        assert!(!is_market_open(now));
    }

    #[rstest]
    fn test_static_clock_advances_both_notions() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = StaticClock::new(start);
        let t0 = clock.monotonic_now();
        clock.advance(Duration::from_secs(60));
        assert_eq!(clock.now_utc(), start + chrono::Duration::seconds(60));
        assert!(clock.monotonic_now() >= t0 + Duration::from_secs(60));
    }
}
