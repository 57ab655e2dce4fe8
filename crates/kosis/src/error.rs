//! KOSIS's `{err, errMsg}` error-object mapping (spec.md §4.6).

use krfin_core::{Provider, ToolError, ToolErrorKind};
use krfin_network::HttpClientError;

/// Substrings in `errMsg` that indicate a rate-limit rejection rather
/// than a generic API error.
const RATE_LIMIT_HINTS: &[&str] = &["초과", "트래픽"];

#[must_use]
pub fn from_transport(error: &HttpClientError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Kosis, error.to_string())
}

/// Classifies a KOSIS error object's `err`/`errMsg` pair (spec.md §4.6:
/// `"AUTH"→AuthExpired, rate-related text→RateLimited, else ApiError"`).
#[must_use]
pub fn classify_error(err: &str, err_msg: &str) -> (ToolErrorKind, bool) {
    if err == "AUTH" {
        (ToolErrorKind::AuthExpired, false)
    } else if RATE_LIMIT_HINTS.iter().any(|hint| err_msg.contains(hint)) {
        (ToolErrorKind::RateLimited, true)
    } else {
        (ToolErrorKind::ApiError, false)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("AUTH", "등록되지 않은 apiKey입니다", (ToolErrorKind::AuthExpired, false))]
    #[case("ERR", "호출 횟수를 초과하였습니다", (ToolErrorKind::RateLimited, true))]
    #[case("ERR", "잘못된 파라미터입니다", (ToolErrorKind::ApiError, false))]
    fn test_classify_error(#[case] err: &str, #[case] err_msg: &str, #[case] expected: (ToolErrorKind, bool)) {
        assert_eq!(classify_error(err, err_msg), expected);
    }
}
