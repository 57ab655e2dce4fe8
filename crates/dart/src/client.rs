//! The Filings (DART) provider client: URL construction, the
//! rate-limiter/cache-through/HTTP composition every adapter shares, and
//! DART's own `status`-field result mapping (spec.md §4.6).
//!
//! A thin public type wrapping an `HttpClient`, a `RateLimiter`, and a
//! `CacheThrough`, with a single choke point
//! ([`DartClient::fetch_from_origin`]) where status/body-code mapping
//! happens.

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

/// The default per-provider rate budget for Filings (spec.md §4.1 table).
pub const RATE_LIMITS: RateLimiterConfig = RateLimiterConfig {
    per_second: 2,
    per_minute: 60,
    per_day: 20_000,
};

const MEMORY_CACHE_CAPACITY: usize = 2_000;

pub struct DartClient {
    http: HttpClient,
    base_url: String,
    api_key: Secret,
    rate_limiter: RateLimiter<SystemClock>,
    cache: CacheThrough,
    clock: SystemClock,
}

impl DartClient {
    /// # Errors
    ///
    /// Propagates [`DiskCacheError`] if the disk cache file cannot be
    /// opened, or the daily-quota file cannot be read.
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
        let mut query_pairs: Vec<(&str, &str)> = params.to_vec();
        query_pairs.push(("crtfc_key", self.api_key.expose()));
        let query = serde_urlencoded::to_string(&query_pairs)
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Dart, e.to_string()))?;
        let url = format!("{}/api/{endpoint}.json?{query}", self.base_url);

        let response = self
            .http
            .request(Method::GET, url, None, None, cancel)
            .await
            .map_err(|e| error::from_transport(&e))?;
        Ok(response.body)
    }

    /// Downloads the bulk corp-code archive (`CORPCODE.zip`). The
    /// returned bytes are a ZIP archive; extracting `CORPCODE.xml` from
    /// it and handing that text to
    /// `krfin_dart::corp_codes::parse_corp_code_xml` is the caller's
    /// responsibility (`krfin-ingest`), since no archive crate is part
    /// of this workspace's dependency stack.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] on any network failure.
    pub async fn fetch_corp_code_archive(&self, cancel: Option<&CancellationToken>) -> Result<Vec<u8>, ToolError> {
        let query = serde_urlencoded::to_string([("crtfc_key", self.api_key.expose())])
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Dart, e.to_string()))?;
        let url = format!("{}/api/corpCode.xml?{query}", self.base_url);
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
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Dart, inner.to_string(), false)
        }
        AcquireError::RetryExhausted { .. } => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Dart, e.to_string(), true)
        }
    }
}

fn map_disk_error(e: DiskCacheError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Dart, e.to_string())
}

#[async_trait]
impl Client for DartClient {
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
            .unwrap_or_else(|| build_key(Provider::Dart, endpoint, params));
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
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Dart, e.to_string()))?;

        let status = body.get("status").and_then(serde_json::Value::as_str).unwrap_or("000");
        if let Some((kind, retryable)) = error::classify_status(status) {
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("DART returned a non-success status")
                .to_string();
            return Err(ToolError::with_retryable(kind, Provider::Dart, message, retryable));
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

    async fn client(server: &MockServer) -> DartClient {
        let dir = tempdir().unwrap();
        DartClient::new(
            Secret::new("test-key"),
            server.uri(),
            dir.path().join("dart-cache.sqlite"),
            dir.path().join("dart-rate.json"),
        )
        .await
        .unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn test_success_status_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/company.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "000",
                "corp_name": "삼성전자",
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let response = client
            .request("company", &[("corp_code", "00126380")], CacheOptions::default(), None)
            .await
            .unwrap();
        assert_eq!(response.body["corp_name"], "삼성전자");
        assert_eq!(response.provenance, krfin_network::Provenance::Origin);
    }

    #[rstest]
    #[tokio::test]
    async fn test_status_010_maps_to_non_retryable_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/company.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "010",
                "message": "등록되지 않은 키입니다.",
            })))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client
            .request("company", &[("corp_code", "00126380")], CacheOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::AuthExpired);
        assert!(!err.retryable);
    }

    #[rstest]
    #[tokio::test]
    async fn test_status_011_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/company.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "011"})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        let err = client
            .request("company", &[], CacheOptions::default(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn test_cold_then_cached_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/company.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "000", "v": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server).await;
        let opts = CacheOptions::default().with_ttl(Duration::from_secs(60));

        let first = client
            .request("company", &[("corp_code", "00126380")], opts.clone(), None)
            .await
            .unwrap();
        assert_eq!(first.provenance, krfin_network::Provenance::Origin);

        let second = client
            .request("company", &[("corp_code", "00126380")], opts, None)
            .await
            .unwrap();
        assert_eq!(second.provenance, krfin_network::Provenance::Memory);
    }
}
