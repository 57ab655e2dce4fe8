//! KIS's `rt_cd`/message-code result mapping and the 401/token-sentinel
//! detection that drives the retry-once behavior in
//! [`crate::client::KisClient`] (spec.md §4.6).

use krfin_core::{Provider, ToolError, ToolErrorKind};
use krfin_network::HttpClientError;

/// HTTP 500 bodies carrying any of these message codes are treated as a
/// 401 for the purpose of refresh-and-retry (spec.md §4.6).
const TOKEN_LIFECYCLE_SENTINELS: &[&str] = &["EGW00121", "EGW00122", "EGW00123"];

/// KIS's own rate-limit sentinel: "초당 거래건수를 초과하였습니다" (per-second
/// transaction count exceeded).
const RATE_LIMIT_MSG_CD: &str = "EGW00201";

#[must_use]
pub fn from_transport(error: &HttpClientError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Kis, error.to_string())
}

/// Whether a (non-2xx) response body should be treated as an expired
/// token, beyond the literal HTTP 401 case.
#[must_use]
pub fn body_has_token_sentinel(body: &str) -> bool {
    TOKEN_LIFECYCLE_SENTINELS.iter().any(|sentinel| body.contains(sentinel))
}

/// Classifies a successful HTTP response's `rt_cd`/`msg_cd` pair.
/// Returns `None` for `"0"` (success).
#[must_use]
pub fn classify_rt_cd(rt_cd: &str, msg_cd: &str) -> Option<(ToolErrorKind, bool)> {
    if rt_cd == "0" {
        return None;
    }
    if msg_cd == RATE_LIMIT_MSG_CD {
        Some((ToolErrorKind::RateLimited, true))
    } else {
        Some((ToolErrorKind::ApiError, false))
    }
}
