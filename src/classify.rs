//! Translation of free-text transport failures into [`FetchError`].
//!
//! This is the only place that inspects error message text. Matching is
//! case-insensitive and checked in order: not-found phrasing, then rate
//! limiting, then timeouts; anything else is a connection failure.
//!
//! The endpoint and package ID are removed from the text before matching, so
//! a port such as `:4290` or an ID containing `429` cannot trigger a pattern.

use std::time::Duration;

use sui_interface_types::Network;

use crate::error::FetchError;

const NOT_FOUND_PATTERNS: &[&str] = &[
    "not found",
    "does not exist",
    "no module found",
    "notexists",
];
const RATE_LIMIT_PATTERNS: &[&str] = &["rate limit", "429", "too many requests"];
const TIMEOUT_PATTERNS: &[&str] = &["timeout", "etimedout", "timed out"];

/// What was being fetched when a transport call failed.
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub endpoint: &'a str,
    pub network: Network,
    pub package_id: &'a str,
    /// Set for module-level calls; a not-found then means the module.
    pub module_name: Option<&'a str>,
    pub timeout: Duration,
}

/// Classify a transport error raised while serving `ctx`.
pub fn classify_error(error: &anyhow::Error, ctx: &CallContext<'_>) -> FetchError {
    let message = matchable_text(error, ctx);
    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| message.contains(p));

    if matches_any(NOT_FOUND_PATTERNS) {
        return match ctx.module_name {
            Some(module_name) => FetchError::ModuleNotFound {
                package_id: ctx.package_id.to_string(),
                module_name: module_name.to_string(),
                network: ctx.network,
            },
            None => FetchError::PackageNotFound {
                package_id: ctx.package_id.to_string(),
                network: ctx.network,
            },
        };
    }
    if matches_any(RATE_LIMIT_PATTERNS) {
        return FetchError::RpcRateLimited {
            endpoint: ctx.endpoint.to_string(),
        };
    }
    if matches_any(TIMEOUT_PATTERNS) {
        return FetchError::RpcTimeout {
            endpoint: ctx.endpoint.to_string(),
            timeout_ms: ctx.timeout.as_millis() as u64,
        };
    }
    FetchError::ConnectionFailed {
        endpoint: ctx.endpoint.to_string(),
        cause: format!("{:#}", error),
    }
}

/// Lowercased error text with the caller-supplied identifiers blanked out.
fn matchable_text(error: &anyhow::Error, ctx: &CallContext<'_>) -> String {
    let mut message = format!("{:#}", error).to_lowercase();
    let endpoint = ctx.endpoint.to_lowercase();
    let authority = endpoint
        .split_once("://")
        .map_or(endpoint.as_str(), |(_, rest)| rest)
        .split('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let package_id = ctx.package_id.to_lowercase();

    for needle in [endpoint.as_str(), authority.as_str(), package_id.as_str()] {
        if !needle.is_empty() {
            message = message.replace(needle, " ");
        }
    }
    message
}
