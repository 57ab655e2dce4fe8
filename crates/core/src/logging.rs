//! Process-wide structured logging setup.
//!
//! Library crates (`krfin-network`, the adapters, `krfin-tools`) only
//! ever emit `tracing` events; only binaries (`krfin-ingest`) call
//! [`init`].

use tracing_subscriber::EnvFilter;

/// Installs a `tracing-subscriber` fmt layer driven by `RUST_LOG`,
/// defaulting to `info` when unset. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
