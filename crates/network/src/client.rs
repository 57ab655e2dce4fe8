//! The uniform `request` contract every provider adapter implements
//! (spec.md §4.6/§6): "all clients are composed identically on top:
//! request → rate limiter acquire → cache-through lookup → (on miss) HTTP
//! fetch → body parse → provider-specific result-code map → typed Tool
//! Result."
//!
//! `Client` itself stays at the raw-bytes layer so it is dyn-safe (no
//! generic method) — `krfin-tools` deserializes the returned JSON into
//! typed domain results, the same split `OKXHttpInnerClient` draws
//! between raw HTTP plumbing and `okx::common::parse`'s typed parsing.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Per-call cache overrides (spec.md §4.6 "optional cache options").
#[derive(Debug, Clone, Default)]
pub struct CacheOptions {
    /// `None` means "use the endpoint's default TTL policy"; `Some(None)`
    /// is not representable here because a caller who wants "permanent"
    /// passes `ttl_override: Some(None)` via [`TtlOverride`] instead — see
    /// that type for why this needs a tri-state.
    pub ttl_override: Option<TtlOverride>,
    pub explicit_key: Option<String>,
    pub force_refresh: bool,
}

/// A caller-supplied TTL override: a concrete duration, or explicitly
/// permanent (null TTL per spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlOverride {
    Duration(Duration),
    Permanent,
}

impl CacheOptions {
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(TtlOverride::Duration(ttl));
        self
    }

    #[must_use]
    pub fn permanent(mut self) -> Self {
        self.ttl_override = Some(TtlOverride::Permanent);
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.explicit_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// The metadata every successful fetch carries (spec.md §3 "Tool
/// Result").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseMetadata {
    pub response_time: Duration,
    pub remaining_daily: u64,
    pub market_open: bool,
    pub used_fallback: bool,
}

/// The raw outcome of a successful `request`: the provider's parsed JSON
/// body plus metadata. Typed tool functions in `krfin-tools` deserialize
/// `body` into a concrete type.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub body: serde_json::Value,
    pub metadata: ResponseMetadata,
    pub provenance: crate::cache::Provenance,
}

/// The uniform fetch contract every provider client implements.
#[async_trait]
pub trait Client: Send + Sync {
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cache_opts: CacheOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<RawResponse, krfin_core::ToolError>;
}
