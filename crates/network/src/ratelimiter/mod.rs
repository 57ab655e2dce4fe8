//! Multi-tier rate limiting: in-memory per-second/per-minute token
//! buckets guarding a disk-persisted civil-day counter, exactly as
//! spec.md §4.1 describes.
//!
//! A `Quota` per tier, burst-capacity-equals-rate semantics. The
//! persisted daily tier is additional: an exchange-style per-second/
//! per-minute limiter has no such concept, but DART/KIS/ECOS/KOSIS all
//! impose a civil-day budget on top.

pub mod daily;
pub mod limiter;
pub mod quota;

pub use daily::{DailyQuota, DailyQuotaError};
pub use limiter::{AcquireError, RateLimiter, RateLimiterConfig, RateStatus};
pub use quota::Quota;
