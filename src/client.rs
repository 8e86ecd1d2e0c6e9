//! Retrying fullnode client.
//!
//! Wraps a [`SuiRpcTransport`] with the retry policy and turns every failure
//! into a [`FetchError`]. All operations are idempotent reads.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use sui_interface_types::Network;
use sui_transport::SuiRpcTransport;

use crate::cancel::CancelToken;
use crate::classify::{classify_error, CallContext};
use crate::error::{FetchError, FetchResult};
use crate::retry::{with_retries, RetryPolicy};

#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn SuiRpcTransport>,
    network: Network,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("endpoint", &self.transport.endpoint())
            .field("network", &self.network)
            .field("policy", &self.policy)
            .finish()
    }
}

impl RpcClient {
    pub fn new(transport: Arc<dyn SuiRpcTransport>, network: Network, policy: RetryPolicy) -> Self {
        Self {
            transport,
            network,
            policy,
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Normalized interface of one module.
    pub async fn get_normalized_interface(
        &self,
        package_id: &str,
        module_name: &str,
        cancel: &CancelToken,
    ) -> FetchResult<Value> {
        self.call(
            "sui_getNormalizedMoveModule",
            package_id,
            Some(module_name),
            cancel,
            || {
                self.transport
                    .get_normalized_move_module(package_id, module_name)
            },
        )
        .await
    }

    /// Module names of a package, sorted.
    pub async fn get_package_module_names(
        &self,
        package_id: &str,
        cancel: &CancelToken,
    ) -> FetchResult<Vec<String>> {
        const METHOD: &str = "sui_getNormalizedMoveModulesByPackage";
        let value = self
            .call(METHOD, package_id, None, cancel, || {
                self.transport
                    .get_normalized_move_modules_by_package(package_id)
            })
            .await?;

        let modules = value
            .as_object()
            .ok_or_else(|| self.malformed(METHOD, "expected an object keyed by module name"))?;
        let mut names: Vec<String> = modules.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Disassembled source of every module in a package.
    pub async fn get_disassembled_source(
        &self,
        package_id: &str,
        cancel: &CancelToken,
    ) -> FetchResult<BTreeMap<String, String>> {
        let object = self
            .call("sui_getObject", package_id, None, cancel, || {
                self.transport.get_package_object(package_id)
            })
            .await?;

        let content = object.get("data").and_then(|d| d.get("content"));
        let is_package = content
            .and_then(|c| c.get("dataType"))
            .and_then(Value::as_str)
            == Some("package");
        let disassembled = content
            .and_then(|c| c.get("disassembled"))
            .and_then(Value::as_object);

        match (is_package, disassembled) {
            (true, Some(map)) => Ok(map
                .iter()
                .filter_map(|(name, src)| src.as_str().map(|s| (name.clone(), s.to_string())))
                .collect()),
            (true, None) => Err(self.malformed("sui_getObject", "package content has no disassembled map")),
            (false, _) => Err(FetchError::PackageNotFound {
                package_id: package_id.to_string(),
                network: self.network,
            }),
        }
    }

    /// Disassembled source of one module, if the package has it.
    pub async fn get_module_source(
        &self,
        package_id: &str,
        module_name: &str,
        cancel: &CancelToken,
    ) -> FetchResult<Option<String>> {
        let mut sources = self.get_disassembled_source(package_id, cancel).await?;
        Ok(sources.remove(module_name))
    }

    /// Whether a package object exists. A not-found outcome is `Ok(false)`;
    /// every other error propagates.
    pub async fn package_exists(&self, package_id: &str, cancel: &CancelToken) -> FetchResult<bool> {
        match self.get_disassembled_source(package_id, cancel).await {
            Ok(_) => Ok(true),
            Err(FetchError::PackageNotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn call<T, F, Fut>(
        &self,
        method: &'static str,
        package_id: &str,
        module_name: Option<&str>,
        cancel: &CancelToken,
        request: F,
    ) -> FetchResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let ctx = CallContext {
            endpoint: self.transport.endpoint(),
            network: self.network,
            package_id,
            module_name,
            timeout: self.transport.request_timeout(),
        };
        with_retries(&self.policy, cancel, |attempt| {
            tracing::debug!(method, package_id, module = ?module_name, attempt, "rpc attempt");
            let pending = request();
            async move { pending.await.map_err(|e| classify_error(&e, &ctx)) }
        })
        .await
    }

    fn malformed(&self, method: &str, detail: &str) -> FetchError {
        FetchError::ConnectionFailed {
            endpoint: self.transport.endpoint().to_string(),
            cause: format!("malformed {} response: {}", method, detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use sui_interface_types::RetryConfig;
    use sui_transport::test_utils::{MockMethod, MockTransport};

    fn client(mock: Arc<MockTransport>) -> RpcClient {
        let policy = RetryPolicy::new(RetryConfig::new(3, 10, 100)).with_on_retry(|_, _, _| {});
        RpcClient::new(mock, Network::Mainnet, policy)
    }

    #[tokio::test(start_paused = true)]
    async fn test_interface_retries_transient_failure() {
        let mock = Arc::new(MockTransport::new().with_module("0xdee9", "clob_v2"));
        mock.push_interface_failure("0xdee9", "clob_v2", "HTTP 429 Too Many Requests");
        let client = client(Arc::clone(&mock));

        let iface = client
            .get_normalized_interface("0xdee9", "clob_v2", &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(iface["name"], "clob_v2");
        assert_eq!(mock.calls(MockMethod::NormalizedModule), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_module_is_module_not_found() {
        let mock = Arc::new(MockTransport::new().with_module("0xdee9", "clob_v2"));
        let client = client(Arc::clone(&mock));

        let err = client
            .get_normalized_interface("0xdee9", "clob_v3", &CancelToken::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ModuleNotFound);
        // Uniform retry: not-found also uses every attempt.
        assert_eq!(mock.calls(MockMethod::NormalizedModule), 3);
    }

    #[tokio::test]
    async fn test_module_names_sorted() {
        let mock = Arc::new(
            MockTransport::new()
                .with_module("0x2", "coin")
                .with_module("0x2", "balance")
                .with_module("0x2", "object"),
        );
        let names = client(mock)
            .get_package_module_names("0x2", &CancelToken::never())
            .await
            .unwrap();
        assert_eq!(names, vec!["balance", "coin", "object"]);
    }

    #[tokio::test]
    async fn test_module_source_lookup() {
        let mock = Arc::new(MockTransport::new().with_module("0x2", "coin"));
        let client = client(mock);
        let cancel = CancelToken::never();

        let src = client.get_module_source("0x2", "coin", &cancel).await.unwrap();
        assert!(src.unwrap().contains("module 0x2::coin"));
        let none = client.get_module_source("0x2", "nope", &cancel).await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_package_exists_degrades_not_found() {
        let mock = Arc::new(MockTransport::new().with_module("0x2", "coin"));
        let client = client(Arc::clone(&mock));
        let cancel = CancelToken::never();

        assert!(client.package_exists("0x2", &cancel).await.unwrap());
        assert!(!client.package_exists("0xabc", &cancel).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_package_exists_propagates_other_errors() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_object("0x2", "request timeout after 30000ms");
        let err = client(mock)
            .package_exists("0x2", &CancelToken::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RpcTimeout);
    }

    #[tokio::test]
    async fn test_malformed_module_list() {
        let mock = Arc::new(MockTransport::new());
        mock.set_module_list(
            "0x2",
            sui_transport::test_utils::MockReply::Ok(serde_json::json!(["coin"])),
        );
        let err = client(mock)
            .get_package_module_names("0x2", &CancelToken::never())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }
}
