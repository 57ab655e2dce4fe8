//! ECOS's top-level `{code, message}` error-object mapping (spec.md §4.6).

use krfin_core::{Provider, ToolError, ToolErrorKind};
use krfin_network::HttpClientError;

#[must_use]
pub fn from_transport(error: &HttpClientError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Ecos, error.to_string())
}

/// Classifies ECOS's error-object `code` by sentinel prefix (spec.md
/// §4.6: "map to NotFound / AuthExpired / RateLimited / ApiError by
/// sentinel prefix"). Returns `None` when `code` does not match a known
/// prefix, which callers treat as "no error object present" (success).
#[must_use]
pub fn classify_code(code: &str) -> Option<(ToolErrorKind, bool)> {
    if code.starts_with("INFO-100") {
        Some((ToolErrorKind::NotFound, false))
    } else if code.starts_with("ERROR-100") {
        Some((ToolErrorKind::AuthExpired, false))
    } else if code.starts_with("ERROR-101") || code.starts_with("ERROR-200") {
        Some((ToolErrorKind::RateLimited, true))
    } else if code.starts_with("ERROR-") {
        Some((ToolErrorKind::ApiError, false))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("INFO-100", Some((ToolErrorKind::NotFound, false)))]
    #[case("ERROR-100", Some((ToolErrorKind::AuthExpired, false)))]
    #[case("ERROR-101", Some((ToolErrorKind::RateLimited, true)))]
    #[case("ERROR-200", Some((ToolErrorKind::RateLimited, true)))]
    #[case("ERROR-300", Some((ToolErrorKind::ApiError, false)))]
    #[case("", None)]
    fn test_classify_code(#[case] code: &str, #[case] expected: Option<(ToolErrorKind, bool)>) {
        assert_eq!(classify_code(code), expected);
    }
}
