//! Error taxonomy for the fetch layer.
//!
//! Every failure a caller can observe is one of the [`FetchError`] variants.
//! Transport text is translated exactly once, in [`crate::classify`]; past
//! that point code branches on [`FetchError::kind`] only.

use serde::Serialize;
use std::fmt;
use sui_interface_types::Network;
use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

/// Which caller-supplied identifier failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    InvalidPackageId,
    InvalidModuleName,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::InvalidPackageId => f.write_str("invalid package id"),
            InputKind::InvalidModuleName => f.write_str("invalid module name"),
        }
    }
}

/// Tag of a [`FetchError`], for branching and for JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    PackageNotFound,
    ModuleNotFound,
    RpcRateLimited,
    RpcTimeout,
    ConnectionFailed,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputValidation => "input_validation",
            ErrorKind::PackageNotFound => "package_not_found",
            ErrorKind::ModuleNotFound => "module_not_found",
            ErrorKind::RpcRateLimited => "rpc_rate_limited",
            ErrorKind::RpcTimeout => "rpc_timeout",
            ErrorKind::ConnectionFailed => "connection_failed",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{kind}: {value:?}")]
    InvalidInput { kind: InputKind, value: String },

    #[error("package {package_id} not found on {network}")]
    PackageNotFound { package_id: String, network: Network },

    #[error("module {package_id}::{module_name} not found on {network}")]
    ModuleNotFound {
        package_id: String,
        module_name: String,
        network: Network,
    },

    #[error("rate limited by {endpoint}")]
    RpcRateLimited { endpoint: String },

    #[error("request to {endpoint} timed out after {timeout_ms}ms")]
    RpcTimeout { endpoint: String, timeout_ms: u64 },

    #[error("connection to {endpoint} failed: {cause}")]
    ConnectionFailed { endpoint: String, cause: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidInput { .. } => ErrorKind::InputValidation,
            FetchError::PackageNotFound { .. } => ErrorKind::PackageNotFound,
            FetchError::ModuleNotFound { .. } => ErrorKind::ModuleNotFound,
            FetchError::RpcRateLimited { .. } => ErrorKind::RpcRateLimited,
            FetchError::RpcTimeout { .. } => ErrorKind::RpcTimeout,
            FetchError::ConnectionFailed { .. } => ErrorKind::ConnectionFailed,
            FetchError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PackageNotFound | ErrorKind::ModuleNotFound
        )
    }

    /// Rate limiting, timeouts and connection failures.
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RpcRateLimited | ErrorKind::RpcTimeout | ErrorKind::ConnectionFailed
        )
    }

    pub(crate) fn invalid_package_id(value: &str) -> Self {
        FetchError::InvalidInput {
            kind: InputKind::InvalidPackageId,
            value: value.to_string(),
        }
    }

    pub(crate) fn invalid_module_name(value: &str) -> Self {
        FetchError::InvalidInput {
            kind: InputKind::InvalidModuleName,
            value: value.to_string(),
        }
    }
}
