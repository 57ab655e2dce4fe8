//! A thin, cancellable wrapper around [`reqwest::Client`].
//!
//! Every provider adapter builds its own `send_request` choke point on
//! top of this type (see `nautilus-okx`'s `OKXHttpInnerClient` for the
//! idiom this generalizes); this crate only owns transport concerns —
//! timeouts, cancellation, and converting transport-level failures into
//! a typed, retryable-aware error. Provider-specific status/body-code
//! mapping lives one layer up, in each adapter's `error` module.

use std::{collections::HashMap, time::Duration};

use reqwest::Method;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use krfin_core::consts::{DEFAULT_HTTP_TIMEOUT_SECS, KRFIN_USER_AGENT};

/// Transport-level failures, not yet interpreted by a provider's
/// status/body-code map.
#[derive(Debug, Error)]
pub enum HttpClientError {
    /// The request was cancelled via the caller's [`CancellationToken`]
    /// before it completed. Carries no HTTP status; callers must not
    /// write a cache entry for this outcome (spec.md §5 "Cancellation").
    #[error("request cancelled")]
    Cancelled,
    /// DNS failure, connection reset, TLS error, or a timeout — anything
    /// that never produced an HTTP response.
    #[error("network error: {0}")]
    Transport(String),
    /// A header value failed to construct (e.g. non-ASCII bearer token).
    #[error("invalid header value: {0}")]
    InvalidHeader(String),
}

impl HttpClientError {
    /// Whether a caller should consider retrying. Transport failures are
    /// retryable; a cancelled request is a caller decision, not ours, so
    /// it is not retryable on our classification (the caller asked to
    /// stop).
    #[must_use]
    pub const fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// A raw HTTP response: status code plus body bytes. Deliberately not
/// generic over a deserialized type — provider adapters decide how (and
/// whether) to parse the body depending on their own status/body-code
/// conventions, which HTTP status alone cannot reliably signal (spec.md
/// §1: "HTTP status is unreliable").
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[must_use]
    pub fn body_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// A cancellable HTTP client with a fixed set of default headers.
pub struct HttpClient {
    inner: reqwest::Client,
    default_headers: HashMap<String, String>,
}

impl HttpClient {
    /// Builds a client with the given default headers (merged under
    /// request-specific headers on every call) and timeout.
    ///
    /// # Panics
    ///
    /// Panics if the underlying `reqwest::Client` cannot be constructed,
    /// which only happens on a fundamentally broken TLS backend.
    #[must_use]
    pub fn new(default_headers: HashMap<String, String>, timeout_secs: Option<u64>) -> Self {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS));
        let inner = reqwest::Client::builder()
            .user_agent(KRFIN_USER_AGENT)
            .timeout(timeout)
            .build()
            .expect("reqwest client construction should never fail with default TLS backend");
        Self {
            inner,
            default_headers,
        }
    }

    /// Sends a request, racing it against `cancel` if provided.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Cancelled`] if `cancel` fires first,
    /// [`HttpClientError::Transport`] for any non-HTTP failure, or
    /// [`HttpClientError::InvalidHeader`] for a malformed header value.
    pub async fn request(
        &self,
        method: Method,
        url: String,
        extra_headers: Option<HashMap<String, String>>,
        body: Option<Vec<u8>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<HttpResponse, HttpClientError> {
        let mut request = self.inner.request(method, &url);

        for (key, value) in &self.default_headers {
            request = request.header(key, value);
        }
        if let Some(extra) = extra_headers {
            for (key, value) in extra {
                request = request.header(key, value);
            }
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let send_future = request.send();

        let response = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(HttpClientError::Cancelled),
                    result = send_future => result,
                }
            }
            None => send_future.await,
        }
        .map_err(|e| HttpClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::Transport(e.to_string()))?;

        Ok(HttpResponse {
            status,
            body: bytes.to_vec(),
        })
    }
}
