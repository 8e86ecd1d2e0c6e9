//! The read-only capability the fetcher needs from a fullnode.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Read-only access to a Sui fullnode.
///
/// Implementations report failures as free-text `anyhow` errors; turning
/// them into structured errors is the caller's job.
#[async_trait]
pub trait SuiRpcTransport: Send + Sync {
    /// URL (or label) of the endpoint, used in error reports.
    fn endpoint(&self) -> &str;

    /// Per-request timeout the transport enforces.
    fn request_timeout(&self) -> Duration;

    /// `sui_getNormalizedMoveModule`.
    async fn get_normalized_move_module(&self, package_id: &str, module_name: &str)
        -> Result<Value>;

    /// `sui_getNormalizedMoveModulesByPackage`: an object keyed by module name.
    async fn get_normalized_move_modules_by_package(&self, package_id: &str) -> Result<Value>;

    /// `sui_getObject` with content; for packages `data.content.disassembled`
    /// maps module names to disassembled source.
    async fn get_package_object(&self, package_id: &str) -> Result<Value>;
}
