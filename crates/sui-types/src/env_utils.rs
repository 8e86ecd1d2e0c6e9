//! Environment variable parsing utilities.
//!
//! Configuration for the fetcher is layered: built-in defaults, then
//! environment variables, then command-line flags. These helpers cover the
//! middle layer so that every knob is parsed the same way:
//!
//! ```
//! use sui_interface_types::env_utils::{env_duration_ms, env_var_or};
//! use std::time::Duration;
//!
//! let attempts: u32 = env_var_or("SUI_RPC_MAX_ATTEMPTS", 3);
//! let base = env_duration_ms("SUI_RPC_RETRY_BASE_MS", Duration::from_millis(250));
//! # let _ = (attempts, base);
//! ```
//!
//! Unset or unparseable values fall back to the default; blank strings count
//! as unset.

use std::str::FromStr;
use std::time::Duration;

fn raw(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set, blank, or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    raw(key).and_then(|v| v.parse().ok())
}

/// Parse an environment variable with a default value.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Check if an environment variable is set to a truthy value, with a default.
///
/// `1`, `true`, `yes`, `on` are truthy and `0`, `false`, `no`, `off` are
/// falsy (case-insensitive). Anything else yields the default.
pub fn env_bool_or(key: &str, default: bool) -> bool {
    match raw(key).map(|v| v.to_lowercase()).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Get an environment variable as a string, if set and non-blank.
pub fn env_string(key: &str) -> Option<String> {
    raw(key)
}

/// Get an environment variable as a string with a default value.
pub fn env_string_or(key: &str, default: &str) -> String {
    raw(key).unwrap_or_else(|| default.to_string())
}

/// Read a duration expressed in whole seconds.
pub fn env_duration_secs(key: &str, default: Duration) -> Duration {
    env_var::<u64>(key)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Read a duration expressed in milliseconds.
pub fn env_duration_ms(key: &str, default: Duration) -> Duration {
    env_var::<u64>(key)
        .map(Duration::from_millis)
        .unwrap_or(default)
}
