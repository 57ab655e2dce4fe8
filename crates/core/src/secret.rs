//! A zeroized, redacted-`Debug` wrapper for API keys, app secrets, and
//! bearer tokens, shared by every adapter crate that holds credential
//! material.
//!
//! Generalizes a zeroize-on-drop, redacted-`Debug` credential type to
//! plain bearer/API-key strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret string that zeroizes its backing memory on drop and never
/// renders its contents through `Debug`.
#[derive(Clone, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_debug_never_exposes_value() {
        let secret = Secret::new("super-secret-api-key");
        let rendered = format!("{secret:?}");
        assert!(!rendered.contains("super-secret-api-key"));
        assert_eq!(rendered, "Secret(<redacted>)");
    }

    #[rstest]
    fn test_expose_returns_the_value() {
        let secret = Secret::new("value");
        assert_eq!(secret.expose(), "value");
    }
}
