//! Syntactic checks on caller-supplied identifiers.
//!
//! These run before any cache lookup or RPC call.

use crate::error::{FetchError, FetchResult};

/// Accepts `0x` followed by one or more hex digits (`^0x[a-fA-F0-9]+$`).
pub fn validate_package_id(package_id: &str) -> FetchResult<()> {
    let valid = package_id
        .strip_prefix("0x")
        .map(|hex| !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(FetchError::invalid_package_id(package_id))
    }
}

/// Accepts a Move identifier (`^[a-zA-Z_][a-zA-Z0-9_]*$`).
pub fn validate_module_name(module_name: &str) -> FetchResult<()> {
    let mut bytes = module_name.bytes();
    let valid = match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => {
            bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(FetchError::invalid_module_name(module_name))
    }
}
