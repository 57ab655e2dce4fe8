//! DART's `status` result-code mapping (spec.md §4.6).

use krfin_core::{Provider, ToolError, ToolErrorKind};
use krfin_network::HttpClientError;

/// Maps a transport-level failure into a provider-tagged [`ToolError`].
#[must_use]
pub fn from_transport(error: &HttpClientError) -> ToolError {
    ToolError::new(ToolErrorKind::NetworkError, Provider::Dart, error.to_string())
}

/// Classifies DART's `status` field. Returns `None` for `"000"`
/// (success); otherwise the `ToolErrorKind` and whether this particular
/// instance should be treated as retryable, since ApiError's default
/// classification (non-retryable) does not hold for DART's 8xx-class
/// codes (spec.md §4.6: "everything else → ApiError (retryable for
/// 8xx-class codes)").
#[must_use]
pub fn classify_status(status: &str) -> Option<(ToolErrorKind, bool)> {
    match status {
        "000" => None,
        "010" => Some((ToolErrorKind::AuthExpired, false)),
        "011" | "013" => Some((ToolErrorKind::NotFound, false)),
        "020" => Some((ToolErrorKind::RateLimited, true)),
        other if other.starts_with('8') => Some((ToolErrorKind::ApiError, true)),
        _ => Some((ToolErrorKind::ApiError, false)),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("000", None)]
    #[case("010", Some((ToolErrorKind::AuthExpired, false)))]
    #[case("011", Some((ToolErrorKind::NotFound, false)))]
    #[case("013", Some((ToolErrorKind::NotFound, false)))]
    #[case("020", Some((ToolErrorKind::RateLimited, true)))]
    #[case("800", Some((ToolErrorKind::ApiError, true)))]
    #[case("900", Some((ToolErrorKind::ApiError, false)))]
    fn test_classify_status(#[case] status: &str, #[case] expected: Option<(ToolErrorKind, bool)>) {
        assert_eq!(classify_status(status), expected);
    }
}
