//! Shared constants referenced across crates.

/// `User-Agent` header sent on every outbound request.
pub const KRFIN_USER_AGENT: &str = concat!("krfin/", env!("CARGO_PKG_VERSION"));

/// Default HTTP timeout, in seconds, for any provider that does not
/// override it (spec.md §5 "Timeouts").
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// The bound on rate-limiter retry rounds before giving up with a
/// retry-exhausted error (spec.md §4.1).
pub const DEFAULT_RATE_LIMIT_RETRY_ROUNDS: u32 = 5;

/// Minutes before OAuth token expiry at which `krfin-kis` proactively
/// refreshes (spec.md §4.5/§8 "Token validity predicate").
pub const OAUTH_REFRESH_MARGIN_MINS: i64 = 5;
