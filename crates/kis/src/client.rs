//! The Quotes (KIS) provider client: GET/POST routing, bearer/appkey/
//! appsecret/tr_id headers, and the 401-and-token-sentinel retry-once
//! behavior (spec.md §4.6).
//!
//! Structured like `krfin-dart`'s client — a thin public type composing
//! `HttpClient` + `RateLimiter` + `CacheThrough` — plus an owned
//! [`OAuthManager`] for the bearer lifecycle this provider alone needs.

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
use crate::oauth::{Environment, OAuthManager};

/// The default per-provider rate budget for Quotes (spec.md §4.1 table).
pub const RATE_LIMITS: RateLimiterConfig = RateLimiterConfig {
    per_second: 5,
    per_minute: 100,
    per_day: 100_000,
};

const MEMORY_CACHE_CAPACITY: usize = 2_000;

/// Reserved parameter key carrying the HTTP method override (`"POST"`);
/// absent means GET. Stripped before the request is forwarded, and never
/// reaches the origin as a real query/body field.
const METHOD_PARAM: &str = "_method";

pub struct KisClient {
    http: HttpClient,
    base_url: String,
    appkey: Secret,
    appsecret: Secret,
    oauth: OAuthManager,
    rate_limiter: RateLimiter<SystemClock>,
    cache: CacheThrough,
    clock: SystemClock,
}

impl KisClient {
    /// # Errors
    ///
    /// Propagates errors opening the disk cache or reading the persisted
    /// daily-quota counter.
    pub async fn new(
        appkey: Secret,
        appsecret: Secret,
        environment: Environment,
        token_path: PathBuf,
        disk_cache_path: PathBuf,
        daily_quota_path: PathBuf,
    ) -> anyhow::Result<Self> {
        let disk = DiskCache::open(disk_cache_path).await?;
        let cache = CacheThrough::new(disk, MEMORY_CACHE_CAPACITY);
        let clock = SystemClock;
        let rate_limiter = RateLimiter::new(RATE_LIMITS, daily_quota_path, clock)?;
        let oauth = OAuthManager::new(appkey.clone(), appsecret.clone(), environment, token_path);
        Ok(Self {
            http: HttpClient::new(std::collections::HashMap::new(), None),
            base_url: environment.base_url().to_string(),
            appkey,
            appsecret,
            oauth,
            rate_limiter,
            cache,
            clock,
        })
    }

    /// Sends one attempt against `endpoint` with the given bearer,
    /// returning the raw HTTP response (status kept, since 401 detection
    /// happens one layer up).
    async fn send(
        &self,
        endpoint: &str,
        method: Method,
        tr_id: &str,
        body_params: &[(&str, &str)],
        bearer: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<krfin_network::HttpResponse, ToolError> {
        let mut headers = std::collections::HashMap::new();
        headers.insert("authorization".to_string(), format!("Bearer {bearer}"));
        headers.insert("appkey".to_string(), self.appkey.expose().to_string());
        headers.insert("appsecret".to_string(), self.appsecret.expose().to_string());
        headers.insert("tr_id".to_string(), tr_id.to_string());
        headers.insert(
            "content-type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );

        let (url, body) = match method {
            Method::GET => {
                let query = serde_urlencoded::to_string(body_params)
                    .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Kis, e.to_string()))?;
                (format!("{}/{endpoint}?{query}", self.base_url), None)
            }
            _ => {
                let map: std::collections::BTreeMap<&str, &str> = body_params.iter().copied().collect();
                let bytes = serde_json::to_vec(&map)
                    .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Kis, e.to_string()))?;
                (format!("{}/{endpoint}", self.base_url), Some(bytes))
            }
        };

        self.http
            .request(method, url, Some(headers), body, cancel)
            .await
            .map_err(|e| error::from_transport(&e))
    }

    async fn fetch_from_origin(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, ToolError> {
        let tr_id = params
            .iter()
            .find(|(k, _)| *k == "tr_id")
            .map(|(_, v)| *v)
            .ok_or_else(|| ToolError::new(ToolErrorKind::ParseError, Provider::Kis, "request missing required tr_id"))?;
        let method = if params.iter().any(|(k, v)| *k == METHOD_PARAM && *v == "POST") {
            Method::POST
        } else {
            Method::GET
        };
        let body_params: Vec<(&str, &str)> = params
            .iter()
            .copied()
            .filter(|(k, _)| *k != METHOD_PARAM && *k != "tr_id")
            .collect();

        let now = self.clock.now_utc();
        let bearer = self.oauth.get_token(now).await.map_err(|e| {
            ToolError::new(ToolErrorKind::AuthExpired, Provider::Kis, e.to_string())
        })?;

        let first = self.send(endpoint, method.clone(), tr_id, &body_params, &bearer, cancel).await?;
        if !needs_token_refresh(&first) {
            return Ok(first.body);
        }

        let refreshed = self.oauth.refresh_token(now).await.map_err(|e| {
            ToolError::new(ToolErrorKind::AuthExpired, Provider::Kis, e.to_string())
        })?;
        let second = self.send(endpoint, method, tr_id, &body_params, &refreshed, cancel).await?;
        if needs_token_refresh(&second) {
            return Err(ToolError::new(
                ToolErrorKind::AuthExpired,
                Provider::Kis,
                "token rejected twice after refresh",
            ));
        }
        Ok(second.body)
    }
}

/// Whether a response should trigger the refresh-and-retry path: a
/// literal 401, or a 500 whose body carries a token-lifecycle sentinel
/// (spec.md §4.6).
fn needs_token_refresh(response: &krfin_network::HttpResponse) -> bool {
    response.status == 401 || (response.status == 500 && error::body_has_token_sentinel(&response.body_str()))
}

fn map_acquire_error(e: AcquireError) -> ToolError {
    match e {
        AcquireError::DailyExhausted(inner) => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Kis, inner.to_string(), false)
        }
        AcquireError::RetryExhausted { .. } => {
            ToolError::with_retryable(ToolErrorKind::RateLimited, Provider::Kis, e.to_string(), true)
        }
    }
}

fn map_disk_error(e: DiskCacheError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Kis, e.to_string())
}

#[async_trait]
impl Client for KisClient {
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
            .unwrap_or_else(|| build_key(Provider::Kis, endpoint, params));
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
            .map_err(|e| ToolError::new(ToolErrorKind::ParseError, Provider::Kis, e.to_string()))?;

        let rt_cd = body.get("rt_cd").and_then(serde_json::Value::as_str).unwrap_or("0");
        let msg_cd = body.get("msg_cd").and_then(serde_json::Value::as_str).unwrap_or("");
        if let Some((kind, retryable)) = error::classify_rt_cd(rt_cd, msg_cd) {
            let message = body
                .get("msg1")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("KIS returned a non-success rt_cd")
                .to_string();
            return Err(ToolError::with_retryable(kind, Provider::Kis, message, retryable));
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
