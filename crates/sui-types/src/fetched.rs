//! Types for module data fetched from a Sui fullnode.
//!
//! A [`FetchedModule`] is built once per successful fetch and never mutated
//! afterwards; the fetcher hands out `Arc<FetchedModule>` so the cached copy
//! and every caller's copy are the same allocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::network::Network;

/// Outcome of the best-effort disassembled source fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// Disassembled source was fetched.
    Available { source: String },
    /// The caller asked for source but it could not be fetched.
    Unavailable { reason: String },
    /// The caller did not ask for source.
    NotRequested,
}

impl SourceStatus {
    pub fn source(&self) -> Option<&str> {
        match self {
            SourceStatus::Available { source } => Some(source),
            _ => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SourceStatus::Available { .. })
    }
}

/// A module's normalized interface plus optional disassembled source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedModule {
    /// Package ID exactly as the caller supplied it (e.g. `0xdee9`).
    pub package_id: String,
    pub module_name: String,
    pub network: Network,
    /// `sui_getNormalizedMoveModule` result, kept as raw JSON.
    pub normalized_interface: Value,
    pub source: SourceStatus,
    pub fetched_at: DateTime<Utc>,
}

impl FetchedModule {
    /// Disassembled source, if it was fetched.
    pub fn source_code(&self) -> Option<&str> {
        self.source.source()
    }

    /// Names of the functions exposed in the normalized interface.
    pub fn function_names(&self) -> Vec<String> {
        object_keys(self.normalized_interface.get("exposedFunctions"))
    }

    /// Names of the structs declared in the normalized interface.
    pub fn struct_names(&self) -> Vec<String> {
        object_keys(self.normalized_interface.get("structs"))
    }
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    let mut keys: Vec<String> = value
        .and_then(Value::as_object)
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default();
    keys.sort();
    keys
}
