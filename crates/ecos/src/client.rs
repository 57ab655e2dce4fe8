//! The Central-bank-stats (ECOS) provider client: path-segment URL
//! construction (no query string) and the top-level error-object
//! mapping (spec.md §4.6).

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use krfin_core::{
    Provider, Secret, ToolError, ToolErrorKind,
    time::{Clock, SystemClock},
};
use krfin_network::{
    AcquireError, CacheOptions, CacheThrough, Client, DiskCache, DiskCacheError, FetchError,
    HttpClient, RateLimiter, RateLimiterConfig, RawResponse, ResponseMetadata, TtlOverride,
    cache::build_key,
};

use crate::error;

/// The default per-provider rate budget for Central-bank stats
/// (spec.md §4.1 table).
pub const RATE_LIMITS: RateLimiterConfig = RateLimiterConfig {
    per_second: 2,
    per_minute: 30,
    per_day: 50_000,
};

const MEMORY_CACHE_CAPACITY: usize = 2_000;

/// ECOS's time-series endpoint: appends
/// `<table>/<period-type>/<start-date>/<end-date>/<item1>[/<item2>...]`.
const TIME_SERIES_ENDPOINT: &str = "StatisticSearch";

/// ECOS's catalog-search endpoint: appends a single URL-encoded query
/// term.
const CATALOG_SEARCH_ENDPOINT: &str = "StatisticWord";

pub struct EcosClient {
    http: HttpClient,
    base_url: String,
    api_key: Secret,
    rate_limiter: RateLimiter<SystemClock>,
    cache: CacheThrough,
    clock: SystemClock,
}

impl EcosClient {
    /// # Errors
    ///
    /// Propagates errors opening the disk cache or reading the persisted
    /// daily-quota counter.
    pub async fn new(
        api_key: Secret,
        base_url: impl Into<String>,
        disk_cache_path: PathBuf,
        daily_quota_path: PathBuf,
    ) -> anyhow::Result<Self> {
        let disk = DiskCache::open(disk_cache_path).await?;
        let cache = CacheThrough::new(disk, MEMORY_CACHE_CAPACITY);
        let clock = SystemClock;
        let rate_limiter = RateLimiter::new(RATE_LIMITS, daily_quota_path, clock)?;
        Ok(Self {
            http: HttpClient::new(std::collections::HashMap::new(), None),
            base_url: base_url.into(),
            api_key,
            rate_limiter,
            cache,
            clock,
        })
    }

    async fn fetch_from_origin(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, ToolError> {
        let url = build_url(&self.base_url, endpoint, self.api_key.expose(), params);
        let response = self
            .http
            .request(Method::GET, url, None, None, cancel)
            .await
            .map_err(|e| error::from_transport(&e))?;
        Ok(response.body)
    }
}

/// Reads a named param, falling back to `default` when absent or empty.
fn param_or<'a>(params: &[(&str, &'a str)], key: &str, default: &'a str) -> &'a str {
    params
        .iter()
        .find(|(k, v)| *k == key && !v.is_empty())
        .map_or(default, |(_, v)| *v)
}

/// Builds the endpoint-specific extra path segments, trimming trailing
/// empty segments (spec.md §4.6: "truncating trailing empty segments").
fn extra_segments(endpoint: &str, params: &[(&str, &str)]) -> Vec<String> {
    if endpoint == CATALOG_SEARCH_ENDPOINT {
        let query = param_or(params, "query", "");
        return vec![url::form_urlencoded::byte_serialize(query.as_bytes()).collect()];
    }
    if endpoint == TIME_SERIES_ENDPOINT {
        let mut segments = vec![
            param_or(params, "table", "").to_string(),
            param_or(params, "period_type", "").to_string(),
            param_or(params, "start_date", "").to_string(),
            param_or(params, "end_date", "").to_string(),
            param_or(params, "item1", "").to_string(),
            param_or(params, "item2", "").to_string(),
            param_or(params, "item3", "").to_string(),
            param_or(params, "item4", "").to_string(),
        ];
        while segments.last().is_some_and(String::is_empty) {
            segments.pop();
        }
        return segments;
    }
    Vec::new()
}

/// Builds ECOS's path-segment URL: `<base>/<endpoint>/<api-key>/json/kr/
/// <start-row>/<end-row>/<extra-path-segments>` (spec.md §4.6).
#[must_use]
fn build_url(base_url: &str, endpoint: &str, api_key: &str, params: &[(&str, &str)]) -> String {
    let start_row = param_or(params, "start_row", "1");
    let end_row = param_or(params, "end_row", "100");
    let mut segments = vec![
        base_url.trim_end_matches('/').to_string(),
        endpoint.to_string(),
        api_key.to_string(),
        "json".to_string(),
        "kr".to_string(),
        start_row.to_string(),
        end_row.to_string(),
    ];
    segments.extend(extra_segments(endpoint, params));
    segments.join("/")
}

fn map_acquire_error(e: AcquireError) -> ToolError {
    match e {
        AcquireError::DailyExhausted(inner) => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Ecos, inner.to_string(), false)
        }
        AcquireError::RetryExhausted { .. } => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Ecos, e.to_string(), true)
        }
    }
}

fn map_disk_error(e: DiskCacheError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Ecos, e.to_string())
}

#[async_trait]
impl Client for EcosClient {
    async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cache_opts: CacheOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<RawResponse, ToolError> {
        self.rate_limiter.acquire().await.map_err(map_acquire_error)?;

        let key = cache_opts
            .explicit_key
            .clone()
            .unwrap_or_else(|| build_key(Provider::Ecos, endpoint, params));
        let ttl = match cache_opts.ttl_override {
            Some(TtlOverride::Duration(d)) => Some(d),
            Some(TtlOverride::Permanent) => None,
            None => Some(Duration::ZERO),
        };

        let started_at = self.clock.monotonic_now();
        let (bytes, provenance) = self
            .cache
            .fetch(&key, ttl, cache_opts.force_refresh, &self.clock, || {
                self.fetch_from_origin(endpoint, params, cancel)
            })
            .await
            .map_err(|e| match e {
                FetchError::Disk(inner) => map_disk_error(inner),
                FetchError::Origin(inner) => inner,
            })?;

        let body: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Ecos, e.to_string()))?;

        let code = body
            .get("RESULT")
            .and_then(|r| r.get("CODE"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("");
        if let Some((kind, retryable)) = error::classify_code(code) {
            let message = body
                .get("RESULT")
                .and_then(|r| r.get("MESSAGE"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or("ECOS returned an error object")
                .to_string();
            return Err(ToolError::with_retryable(kind, Provider::Ecos, message, retryable));
        }

        let rate_status = self.rate_limiter.status().await;
        Ok(RawResponse {
            body,
            metadata: ResponseMetadata {
                response_time: self.clock.monotonic_now().duration_since(started_at),
                remaining_daily: rate_status.remaining,
                market_open: krfin_core::time::is_market_open(self.clock.now_utc()),
                used_fallback: false,
            },
            provenance,
        })
    }
}
