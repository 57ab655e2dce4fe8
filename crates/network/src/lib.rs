//! The reusable substrate every provider adapter is built on: an HTTP
//! client wrapper, a multi-tier rate limiter with a disk-persisted daily
//! quota, an LRU memory cache, a disk cache, and the cache-through
//! wrapper composing the three together.
//!
//! Nothing in this crate knows about DART/KIS/ECOS/KOSIS specifically —
//! that is the point: `krfin_network::client::Client` is the one
//! interface every adapter crate implements.

pub mod cache;
pub mod client;
pub mod http;
pub mod ratelimiter;

pub use cache::{CacheThrough, FetchError, Provenance, build_key};
pub use client::{CacheOptions, Client, RawResponse, ResponseMetadata, TtlOverride};
pub use http::{HttpClient, HttpClientError, HttpResponse};
pub use ratelimiter::{AcquireError, RateLimiter, RateLimiterConfig, RateStatus};
