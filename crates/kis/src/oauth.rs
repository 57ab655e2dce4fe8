//! The OAuth2 client-credentials bearer manager (spec.md §4.5), grounded
//! on `nautilus-okx`'s `Credential` idiom: zeroized secret storage,
//! redacted `Debug`, and a disk-persisted token file read on
//! construction and rewritten on refresh.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use krfin_core::{consts::OAUTH_REFRESH_MARGIN_MINS, secret::Secret, time::kst_offset};
use krfin_network::{HttpClient, HttpClientError};

/// Which KIS environment a token was issued for. A token issued for one
/// environment is never valid for the other, even if unexpired (spec.md
/// §3 "OAuth Token" invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Production,
    Sandbox,
}

impl Environment {
    #[must_use]
    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Production => "https://openapi.koreainvestment.com:9443",
            Self::Sandbox => "https://openapivts.koreainvestment.com:29443",
        }
    }
}

/// Failure modes surfaced while obtaining or refreshing a token. Every
/// variant is an instruction to back off, not to retry immediately
/// (spec.md §4.5: "each is surfaced to the caller with instructions to
/// back off").
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Non-2xx issuance response. KIS typically enforces a ≥1-minute gap
    /// between issuances, so this usually means that gap was violated.
    #[error("token issuance rejected with status {status}: {body}")]
    Throttled { status: u16, body: String },
    /// HTTP 2xx but the body carried no bearer token.
    #[error("token issuance response contained no access_token")]
    EmptyToken,
    /// The expiry timestamp in the issuance response could not be parsed.
    #[error("failed to parse token expiry {raw:?}: {source}")]
    ExpiryFormat {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error(transparent)]
    Network(#[from] HttpClientError),
    #[error("failed to read/write token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse token file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse token issuance response: {0}")]
    IssuanceParse(#[source] serde_json::Error),
}

/// The persisted/in-memory token shape (spec.md §3 "OAuth Token").
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OAuthToken {
    bearer: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    environment: Environment,
}

impl OAuthToken {
    /// Valid only if expiry is more than
    /// [`OAUTH_REFRESH_MARGIN_MINS`] away AND the environment tag
    /// matches; otherwise treated as absent (spec.md §3).
    fn is_valid(&self, environment: Environment, now: DateTime<Utc>) -> bool {
        self.environment == environment
            && self.expires_at - now > chrono::Duration::minutes(OAUTH_REFRESH_MARGIN_MINS)
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    access_token: Option<String>,
    #[serde(default)]
    access_token_token_expired: Option<String>,
}

/// Manages the bearer token for one KIS credential pair, in one
/// environment, for the lifetime of a process.
pub struct OAuthManager {
    http: HttpClient,
    base_url: String,
    appkey: Secret,
    appsecret: Secret,
    environment: Environment,
    token_path: PathBuf,
    token: Mutex<Option<OAuthToken>>,
}

impl OAuthManager {
    #[must_use]
    pub fn new(appkey: Secret, appsecret: Secret, environment: Environment, token_path: PathBuf) -> Self {
        let token = Self::load_from_disk(&token_path).ok().flatten();
        Self {
            http: HttpClient::new(std::collections::HashMap::new(), None),
            base_url: environment.base_url().to_string(),
            appkey,
            appsecret,
            environment,
            token_path,
            token: Mutex::new(token),
        }
    }

    fn load_from_disk(path: &PathBuf) -> Result<Option<OAuthToken>, OAuthError> {
        match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| OAuthError::Parse {
                    path: path.clone(),
                    source,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(OAuthError::Io {
                path: path.clone(),
                source,
            }),
        }
    }

    fn persist(&self, token: &OAuthToken) -> Result<(), OAuthError> {
        if let Some(parent) = self.token_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| OAuthError::Io {
                path: self.token_path.clone(),
                source,
            })?;
        }
        let bytes = serde_json::to_vec_pretty(token).expect("OAuthToken always serializes");
        std::fs::write(&self.token_path, bytes).map_err(|source| OAuthError::Io {
            path: self.token_path.clone(),
            source,
        })
    }

    /// Returns a valid bearer, refreshing first if the cached token is
    /// absent or within [`OAUTH_REFRESH_MARGIN_MINS`] of expiry.
    ///
    /// # Errors
    ///
    /// See [`OAuthError`].
    pub async fn get_token(&self, now: DateTime<Utc>) -> Result<String, OAuthError> {
        {
            let guard = self.token.lock().await;
            if let Some(token) = guard.as_ref() {
                if token.is_valid(self.environment, now) {
                    return Ok(token.bearer.clone());
                }
            }
        }
        self.refresh_token(now).await
    }

    /// Forces issuance of a fresh token regardless of the cached one's
    /// validity (spec.md §4.5 `refresh-token`).
    ///
    /// # Errors
    ///
    /// See [`OAuthError`].
    pub async fn refresh_token(&self, now: DateTime<Utc>) -> Result<String, OAuthError> {
        let url = format!("{}/oauth2/tokenP", self.base_url);
        let body = serde_json::json!({
            "grant_type": "client_credentials",
            "appkey": self.appkey.expose(),
            "appsecret": self.appsecret.expose(),
        });
        let mut headers = std::collections::HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        let response = self
            .http
            .request(
                Method::POST,
                url,
                Some(headers),
                Some(serde_json::to_vec(&body).expect("json body always serializes")),
                None,
            )
            .await?;

        if !response.is_success() {
            return Err(OAuthError::Throttled {
                status: response.status,
                body: response.body_str().to_string(),
            });
        }

        let parsed: IssueResponse =
            serde_json::from_slice(&response.body).map_err(OAuthError::IssuanceParse)?;
        let bearer = parsed.access_token.filter(|s| !s.is_empty()).ok_or(OAuthError::EmptyToken)?;
        let raw_expiry = parsed.access_token_token_expired.unwrap_or_default();
        let expires_at = parse_kst_naive(&raw_expiry, now)?;

        let token = OAuthToken {
            bearer: bearer.clone(),
            issued_at: now,
            expires_at,
            environment: self.environment,
        };
        self.persist(&token)?;
        *self.token.lock().await = Some(token);
        Ok(bearer)
    }

    /// Redirects issuance to a different base URL. Only used by
    /// `krfin-kis`'s own client tests to point both the quote requests
    /// and the token issuance at the same `wiremock` server.
    #[cfg(test)]
    pub(crate) fn set_base_url(&mut self, base_url: String) {
        self.base_url = base_url;
    }

    /// Pure predicate: whether the cached token (if any) would currently
    /// be considered valid, without performing IO.
    pub async fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.token
            .lock()
            .await
            .as_ref()
            .is_some_and(|token| token.is_valid(self.environment, now))
    }
}

/// Parses a provider-local wall-clock timestamp (`YYYY-MM-DD HH:MM:SS`,
/// implicitly KST) and annotates it with the UTC+9 offset before
/// converting to UTC (spec.md §4.5). An empty/missing timestamp falls
/// back to one hour from `now`, matching KIS's typical short-lived token
/// lifetime, rather than failing the whole issuance over a field the
/// sandbox environment sometimes omits.
fn parse_kst_naive(raw: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, OAuthError> {
    if raw.is_empty() {
        return Ok(now + chrono::Duration::hours(1));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map_err(|source| OAuthError::ExpiryFormat {
        raw: raw.to_string(),
        source,
    })?;
    use chrono::TimeZone;
    Ok(kst_offset()
        .from_local_datetime(&naive)
        .single()
        .expect("fixed-offset local datetime is always unambiguous")
        .with_timezone(&Utc))
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

    fn now() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 7, 28, 0, 0, 0).unwrap()
    }

    fn manager(token_path: PathBuf, base_url: String, environment: Environment) -> OAuthManager {
        OAuthManager {
            http: HttpClient::new(std::collections::HashMap::new(), None),
            base_url,
            appkey: Secret::new("key"),
            appsecret: Secret::new("secret"),
            environment,
            token_path,
            token: Mutex::new(None),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_refresh_issues_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/tokenP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "abc123",
                "access_token_token_expired": "2026-07-28 23:59:59",
            })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let token_path = dir.path().join("kis-token.json");
        let manager = manager(token_path.clone(), server.uri(), Environment::Production);

        let bearer = manager.refresh_token(now()).await.unwrap();
        assert_eq!(bearer, "abc123");
        assert!(token_path.exists());
        assert!(manager.is_valid(now()).await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_get_token_reuses_cached_when_valid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/tokenP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "first",
                "access_token_token_expired": "2026-07-29 23:59:59",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(dir.path().join("kis-token.json"), server.uri(), Environment::Production);

        let a = manager.get_token(now()).await.unwrap();
        let b = manager.get_token(now()).await.unwrap();
        assert_eq!(a, b);
    }

    #[rstest]
    #[tokio::test]
    async fn test_throttled_issuance_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/tokenP"))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let manager = manager(dir.path().join("kis-token.json"), server.uri(), Environment::Production);

        let err = manager.refresh_token(now()).await.unwrap_err();
        assert!(matches!(err, OAuthError::Throttled { status: 429, .. }));
    }

    #[rstest]
    fn test_token_invalid_across_environment_mismatch() {
        let token = OAuthToken {
            bearer: "x".to_string(),
            issued_at: now(),
            expires_at: now() + chrono::Duration::hours(1),
            environment: Environment::Production,
        };
        assert!(!token.is_valid(Environment::Sandbox, now()));
    }

    #[rstest]
    fn test_token_invalid_within_refresh_margin() {
        let token = OAuthToken {
            bearer: "x".to_string(),
            issued_at: now(),
            expires_at: now() + chrono::Duration::minutes(2),
            environment: Environment::Production,
        };
        assert!(!token.is_valid(Environment::Production, now()));
    }
}
