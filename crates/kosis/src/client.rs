//! The National-stats (KOSIS) provider client: query-string auth plus
//! the fixed `format=json&jsonVD=Y` params every call carries, and the
//! empty-array/error-object response shape (spec.md §4.6).

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

/// The default per-provider rate budget for National stats (spec.md
/// §4.1 table).
pub const RATE_LIMITS: RateLimiterConfig = RateLimiterConfig {
    per_second: 1,
    per_minute: 20,
    per_day: 10_000,
};

const MEMORY_CACHE_CAPACITY: usize = 2_000;

pub struct KosisClient {
    http: HttpClient,
    base_url: String,
    api_key: Secret,
    rate_limiter: RateLimiter<SystemClock>,
    cache: CacheThrough,
    clock: SystemClock,
}

impl KosisClient {
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
        let mut query_pairs: Vec<(&str, &str)> =
            vec![("apiKey", self.api_key.expose()), ("format", "json"), ("jsonVD", "Y")];
        query_pairs.extend(params.iter().copied());
        let query = serde_urlencoded::to_string(&query_pairs)
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Kosis, e.to_string()))?;
        let url = format!("{}/{endpoint}?{query}", self.base_url);

        let response = self
            .http
            .request(Method::GET, url, None, None, cancel)
            .await
            .map_err(|e| error::from_transport(&e))?;
        Ok(response.body)
    }
}

fn map_acquire_error(e: AcquireError) -> ToolError {
    match e {
        AcquireError::DailyExhausted(inner) => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Kosis, inner.to_string(), false)
        }
        AcquireError::RetryExhausted { .. } => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Kosis, e.to_string(), true)
        }
    }
}

fn map_disk_error(e: DiskCacheError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Kosis, e.to_string())
}

#[async_trait]
impl Client for KosisClient {
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
            .unwrap_or_else(|| build_key(Provider::Kosis, endpoint, params));
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
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Kosis, e.to_string()))?;

        if let Some(err) = body.get("err").and_then(serde_json::Value::as_str) {
            let err_msg = body.get("errMsg").and_then(serde_json::Value::as_str).unwrap_or("");
            let (kind, retryable) = error::classify_error(err, err_msg);
            return Err(ToolError::with_retryable(kind, Provider::Kosis, err_msg.to_string(), retryable));
        }
        if body.as_array().is_some_and(<[serde_json::Value]>::is_empty) {
            return Err(ToolError::new(
                ToolErrorKind::NotFound,
                Provider::Kosis,
                "KOSIS returned an empty result set",
            ));
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

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use tempfile::tempdir;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;

    async fn client(server: &MockServer) -> KosisClient {
        let dir = tempdir().unwrap();
        KosisClient::new(
            Secret::new("test-key"),
            server.uri(),
            dir.path().join("kosis-cache.sqlite"),
            dir.path().join("kosis-rate.json"),
        )
        .await
        .unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn test_success_array_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/statisticsData.do"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"PRD_DE": "202401", "DT": "3.5"},
            ])))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let response = client
            .request("statisticsData.do", &[("orgId", "101")], CacheOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(response.body[0]["DT"], "3.5");
    }

    #[rstest]
    #[tokio::test]
    async fn test_empty_array_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/statisticsData.do"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client
            .request("statisticsData.do", &[], CacheOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn test_auth_error_object_maps_to_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/statisticsData.do"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "err": "AUTH",
                "errMsg": "등록되지 않은 apiKey입니다",
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client
            .request("statisticsData.do", &[], CacheOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::AuthExpired);
    }
}
