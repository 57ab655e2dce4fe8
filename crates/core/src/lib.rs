//! Shared primitives used by every `krfin` crate: the closed error
//! taxonomy, the civil/monotonic clock split, environment variable
//! helpers, per-user config-directory layout, and process-wide logging
//! setup.
//!
//! None of the types here know anything about a specific upstream
//! provider; provider-specific behavior lives in the adapter crates
//! (`krfin-dart`, `krfin-kis`, `krfin-ecos`, `krfin-kosis`).

pub mod config;
pub mod consts;
pub mod env;
pub mod error;
pub mod logging;
pub mod provider;
pub mod secret;
pub mod time;

pub use error::{ToolError, ToolErrorKind};
pub use provider::Provider;
pub use secret::Secret;
