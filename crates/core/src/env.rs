//! Environment variable access with explicit, typed failure instead of
//! `.unwrap()`-on-`None` scattered through adapter crates.

use anyhow::{Context, Result};

/// Returns the value of the environment variable for the given `key`.
///
/// # Errors
///
/// Returns an error if the environment variable is not set or is not
/// valid Unicode.
pub fn get_env_var(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("environment variable '{key}' must be set"))
}

/// Returns `value` if `Some`, otherwise falls back to the environment
/// variable named `key`.
///
/// # Errors
///
/// Returns an error only when `value` is `None` and the environment
/// variable is also unset.
pub fn get_or_env_var(value: Option<String>, key: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => get_env_var(key),
    }
}

/// Returns a `bool` flag from an environment variable, defaulting to
/// `false` when unset. Used for the KIS sandbox-vs-production switch.
#[must_use]
pub fn get_env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use std::sync::Mutex;

    use super::*;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[rstest]
    fn test_get_env_var_missing() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::remove_var("KRFIN_TEST_MISSING");
        assert!(get_env_var("KRFIN_TEST_MISSING").is_err());
    }

    #[rstest]
    fn test_get_env_var_present() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("KRFIN_TEST_PRESENT", "value");
        }
        assert_eq!(get_env_var("KRFIN_TEST_PRESENT").unwrap(), "value");
        unsafe {
            std::env::remove_var("KRFIN_TEST_PRESENT");
        }
    }

    #[rstest]
    fn test_get_or_env_var_prefers_value() {
        let _guard = ENV_LOCK.lock().unwrap();
        assert_eq!(
            get_or_env_var(Some("explicit".to_string()), "KRFIN_TEST_UNUSED").unwrap(),
            "explicit"
        );
    }

    #[rstest]
    #[case("1", true)]
    #[case("true", true)]
    #[case("TRUE", true)]
    #[case("0", false)]
    #[case("", false)]
    fn test_get_env_flag(#[case] raw: &str, #[case] expected: bool) {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("KRFIN_TEST_FLAG", raw);
        }
        assert_eq!(get_env_flag("KRFIN_TEST_FLAG"), expected);
        unsafe {
            std::env::remove_var("KRFIN_TEST_FLAG");
        }
    }
}
