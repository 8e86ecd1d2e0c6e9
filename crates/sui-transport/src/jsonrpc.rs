//! JSON-RPC client for Sui fullnodes.
//!
//! ## Endpoints
//! - Mainnet: `https://fullnode.mainnet.sui.io:443`
//! - Testnet: `https://fullnode.testnet.sui.io:443`
//! - Devnet: `https://fullnode.devnet.sui.io:443`
//!
//! ## Usage
//!
//! ```ignore
//! let client = JsonRpcClient::for_network(Network::Mainnet);
//! let iface = client.get_normalized_move_module("0xdee9", "clob_v2").await?;
//! ```
//!
//! Requests are issued with a blocking `ureq` agent on tokio's blocking
//! pool. Error messages are worded so that rate limiting reads as
//! "rate limit", expired timers as "timeout" and missing objects as
//! "not found".

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sui_interface_types::env_utils::env_duration_secs;
use sui_interface_types::Network;

use crate::network::resolve_rpc_endpoint;
use crate::transport::SuiRpcTransport;

/// Longest slice of an HTTP error body carried into an error message.
const MAX_ERROR_BODY: usize = 256;

/// JSON-RPC client for Sui fullnode queries.
#[derive(Clone)]
pub struct JsonRpcClient {
    endpoint: String,
    agent: ureq::Agent,
    timeout: Duration,
    next_id: Arc<AtomicU64>,
}

impl JsonRpcClient {
    /// Default request timeout in seconds (can be overridden by env).
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Default connect timeout in seconds (can be overridden by env).
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    fn default_timeouts() -> (Duration, Duration) {
        (
            env_duration_secs(
                "SUI_RPC_TIMEOUT_SECS",
                Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            ),
            env_duration_secs(
                "SUI_RPC_CONNECT_TIMEOUT_SECS",
                Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        )
    }

    fn build_agent(timeout: Duration, connect_timeout: Duration) -> ureq::Agent {
        ureq::AgentBuilder::new()
            .timeout(timeout)
            .timeout_connect(connect_timeout)
            .build()
    }

    /// Create a client for the public fullnode of `network` (or `SUI_RPC_URL`).
    pub fn for_network(network: Network) -> Self {
        Self::new(&resolve_rpc_endpoint(network, None))
    }

    /// Create a client with a custom endpoint.
    pub fn new(endpoint: &str) -> Self {
        let (timeout, connect_timeout) = Self::default_timeouts();
        Self::with_timeouts(endpoint, timeout, connect_timeout)
    }

    /// Create a client with explicit timeouts.
    pub fn with_timeouts(endpoint: &str, timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            agent: Self::build_agent(timeout, connect_timeout),
            timeout,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Execute a JSON-RPC call on the current thread.
    fn call_blocking(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::trace!(endpoint = %self.endpoint, method, id, "json-rpc request");

        let response: Value = match self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_json(&body)
        {
            Ok(resp) => resp.into_json().map_err(|e| {
                anyhow!(
                    "failed to parse {} response from {}: {}",
                    method,
                    self.endpoint,
                    e
                )
            })?,
            Err(ureq::Error::Status(429, _)) => {
                return Err(anyhow!(
                    "rate limit exceeded (HTTP 429) calling {} at {}",
                    method,
                    self.endpoint
                ));
            }
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                return Err(anyhow!(
                    "{} rejected with HTTP {} by {}: {}",
                    method,
                    code,
                    self.endpoint,
                    truncate(&text)
                ));
            }
            Err(ureq::Error::Transport(t)) => {
                let msg = t.to_string();
                if msg.to_lowercase().contains("timed out") {
                    return Err(anyhow!(
                        "request timeout after {}ms calling {}: {}",
                        self.timeout.as_millis(),
                        method,
                        msg
                    ));
                }
                return Err(anyhow!(
                    "transport error calling {} at {}: {}",
                    method,
                    self.endpoint,
                    msg
                ));
            }
        };

        if let Some(err) = response.get("error").filter(|e| !e.is_null()) {
            let code = err.get("code").cloned().unwrap_or(Value::Null);
            let msg = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(anyhow!("JSON-RPC error {} in {}: {}", code, method, msg));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| anyhow!("no result in {} response", method))
    }

    /// Run a call on tokio's blocking pool.
    async fn call(&self, method: &'static str, params: Value) -> Result<Value> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.call_blocking(method, params))
            .await
            .map_err(|e| anyhow!("JSON-RPC worker for {} failed: {}", method, e))?
    }
}

#[async_trait]
impl SuiRpcTransport for JsonRpcClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_timeout(&self) -> Duration {
        self.timeout
    }

    async fn get_normalized_move_module(
        &self,
        package_id: &str,
        module_name: &str,
    ) -> Result<Value> {
        self.call(
            "sui_getNormalizedMoveModule",
            json!([package_id, module_name]),
        )
        .await
    }

    async fn get_normalized_move_modules_by_package(&self, package_id: &str) -> Result<Value> {
        self.call("sui_getNormalizedMoveModulesByPackage", json!([package_id]))
            .await
    }

    async fn get_package_object(&self, package_id: &str) -> Result<Value> {
        let result = self
            .call(
                "sui_getObject",
                json!([package_id, {"showContent": true, "showType": true}]),
            )
            .await?;
        object_data_or_not_found(package_id, result)
    }
}

/// `sui_getObject` reports missing objects inside `result.error`
/// (e.g. `{"code": "notExists"}`) instead of as a JSON-RPC error.
fn object_data_or_not_found(object_id: &str, result: Value) -> Result<Value> {
    if result.get("data").map(|d| !d.is_null()).unwrap_or(false) {
        return Ok(result);
    }
    let code = result
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or("missing data");
    Err(anyhow!("object {} not found ({})", object_id, code))
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_ERROR_BODY).collect();
    out.push_str("...");
    out
}
