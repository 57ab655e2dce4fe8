//! The closed error taxonomy shared by every provider client and tool
//! function.
//!
//! Errors propagate as values (`Result<T, ToolError>`), never as
//! unwinding panics across the request contract — the HTTP adapter layer
//! is the only place a transport panic/throw is caught and converted into
//! [`ToolErrorKind::NetworkError`].

use thiserror::Error;

use crate::provider::Provider;

/// The closed set of error kinds a tool call can fail with.
///
/// `RateLimited` and 5xx-class `NetworkError` are retryable; every other
/// kind is not (see [`ToolErrorKind::default_retryable`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// The provider's own rate limit (or our local limiter) rejected the call.
    RateLimited,
    /// The auth token/credential is absent, expired, or was rejected twice.
    AuthExpired,
    /// The resource does not exist upstream.
    NotFound,
    /// The provider returned a non-success result code we don't special-case.
    ApiError,
    /// Transport-level failure: DNS, timeout, connection reset.
    NetworkError,
    /// The response body did not parse, or a required field was missing.
    ParseError,
}

impl ToolErrorKind {
    /// The retryable flag this kind carries unless a call site overrides it.
    #[must_use]
    pub const fn default_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::NetworkError)
    }
}

/// A typed, provider-tagged error returned by any `request` call.
///
/// Invariant: a [`ToolError`] never carries a success payload — callers
/// that need "maybe failed, maybe not" semantics use
/// `Result<T, ToolError>` (aliased as `ToolResult<T>` in `krfin-tools`),
/// not a combined struct.
#[derive(Debug, Error, Clone)]
#[error("{provider} {kind:?}: {message}")]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    pub provider: Provider,
    pub retryable: bool,
}

impl ToolError {
    /// Builds a [`ToolError`] using the kind's default retryable flag.
    #[must_use]
    pub fn new(kind: ToolErrorKind, provider: Provider, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider,
            retryable: kind.default_retryable(),
        }
    }

    /// Builds a [`ToolError`] with an explicit retryable override.
    ///
    /// Used by the Quotes client's `ApiError` mapping, where a `rt_cd`
    /// sentinel overrides the default to mean "rate limited" even though
    /// HTTP itself reported 200.
    #[must_use]
    pub fn with_retryable(
        kind: ToolErrorKind,
        provider: Provider,
        message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            provider,
            retryable,
        }
    }

    /// Remediation hint shown to a user-facing caller, per §7.
    #[must_use]
    pub fn remediation_hint(&self) -> &'static str {
        match self.kind {
            ToolErrorKind::RateLimited => "wait for the daily quota to reset at midnight KST, or slow down the request rate",
            ToolErrorKind::AuthExpired => "check that the API key/credential is valid and not expired",
            ToolErrorKind::NotFound => "verify the identifier (ticker, registration code, or endpoint parameters)",
            ToolErrorKind::ApiError => "the upstream provider rejected the request; check the provider's error message",
            ToolErrorKind::NetworkError => "retry shortly; this may be a transient connectivity issue",
            ToolErrorKind::ParseError => "the response shape did not match what this client expects; this is a client-side bug",
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ToolErrorKind::RateLimited, true)]
    #[case(ToolErrorKind::NetworkError, true)]
    #[case(ToolErrorKind::AuthExpired, false)]
    #[case(ToolErrorKind::NotFound, false)]
    #[case(ToolErrorKind::ApiError, false)]
    #[case(ToolErrorKind::ParseError, false)]
    fn test_default_retryable(#[case] kind: ToolErrorKind, #[case] expected: bool) {
        assert_eq!(kind.default_retryable(), expected);
    }

    #[rstest]
    fn test_new_uses_default_retryable() {
        let err = ToolError::new(ToolErrorKind::RateLimited, Provider::Dart, "quota exceeded");
        assert!(err.retryable);
        assert_eq!(err.provider, Provider::Dart);
    }

    #[rstest]
    fn test_with_retryable_overrides() {
        let err = ToolError::with_retryable(
            ToolErrorKind::ApiError,
            Provider::Kis,
            "rate sentinel in message",
            true,
        );
        assert!(err.retryable);
    }
}
