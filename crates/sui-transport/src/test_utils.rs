//! Scriptable in-memory transport for tests.
//!
//! Provides canned fullnode responses and failure injection without network
//! access.
//!
//! # Example
//!
//! ```ignore
//! let mock = MockTransport::new()
//!     .with_module("0xdee9", "clob_v2")
//!     .with_module("0xdee9", "custodian");
//! mock.push_interface_failure("0xdee9", "clob_v2", "429 Too Many Requests");
//! // first call fails, second returns the canned interface
//! ```

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::transport::SuiRpcTransport;

/// Which transport method a recorded call went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockMethod {
    NormalizedModule,
    ModulesByPackage,
    PackageObject,
}

/// Canned reply: a JSON value or a free-text failure.
#[derive(Debug, Clone)]
pub enum MockReply {
    Ok(Value),
    Err(String),
}

impl MockReply {
    fn into_result(self) -> Result<Value> {
        match self {
            MockReply::Ok(v) => Ok(v),
            MockReply::Err(msg) => Err(anyhow!(msg)),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

impl Script {
    fn next(&mut self) -> Option<MockReply> {
        self.queued.pop_front().or_else(|| self.fallback.clone())
    }
}

#[derive(Debug, Default)]
struct PackageFixture {
    modules: BTreeMap<String, Value>,
    sources: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct MockState {
    packages: HashMap<String, PackageFixture>,
    interfaces: HashMap<(String, String), Script>,
    module_lists: HashMap<String, Script>,
    objects: HashMap<String, Script>,
    calls: Vec<(MockMethod, String)>,
}

/// In-memory [`SuiRpcTransport`] driven by fixtures and scripted replies.
///
/// Resolution order per call: queued replies, then an explicit fallback,
/// then the package fixtures registered with [`MockTransport::with_module`].
pub struct MockTransport {
    endpoint: String,
    timeout: Duration,
    latency: Option<Duration>,
    state: Mutex<MockState>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            endpoint: "mock://sui-fullnode".to_string(),
            timeout: Duration::from_secs(30),
            latency: None,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Sleep this long (tokio time) before answering each call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Register a module with a minimal normalized interface and source.
    pub fn with_module(self, package_id: &str, module_name: &str) -> Self {
        let interface = json!({
            "fileFormatVersion": 6,
            "address": package_id,
            "name": module_name,
            "friends": [],
            "structs": {},
            "exposedFunctions": {},
        });
        let source = format!("module {}::{} {{\n}}\n", package_id, module_name);
        self.with_module_fixture(package_id, module_name, interface, source)
    }

    /// Register a module with an explicit interface and source.
    pub fn with_module_fixture(
        self,
        package_id: &str,
        module_name: &str,
        interface: Value,
        source: String,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let pkg = state.packages.entry(package_id.to_string()).or_default();
            pkg.modules.insert(module_name.to_string(), interface);
            pkg.sources.insert(module_name.to_string(), source);
        }
        self
    }

    /// Queue a failure for the next interface call of this module.
    pub fn push_interface_failure(&self, package_id: &str, module_name: &str, message: &str) {
        self.state
            .lock()
            .interfaces
            .entry((package_id.to_string(), module_name.to_string()))
            .or_default()
            .queued
            .push_back(MockReply::Err(message.to_string()));
    }

    /// Make every interface call of this module fail (after queued replies).
    pub fn fail_interface(&self, package_id: &str, module_name: &str, message: &str) {
        self.state
            .lock()
            .interfaces
            .entry((package_id.to_string(), module_name.to_string()))
            .or_default()
            .fallback = Some(MockReply::Err(message.to_string()));
    }

    /// Queue a failure for the next module listing of this package.
    pub fn push_module_list_failure(&self, package_id: &str, message: &str) {
        self.state
            .lock()
            .module_lists
            .entry(package_id.to_string())
            .or_default()
            .queued
            .push_back(MockReply::Err(message.to_string()));
    }

    /// Override the module listing of this package.
    pub fn set_module_list(&self, package_id: &str, reply: MockReply) {
        self.state
            .lock()
            .module_lists
            .entry(package_id.to_string())
            .or_default()
            .fallback = Some(reply);
    }

    /// Queue a failure for the next object fetch of this package.
    pub fn push_object_failure(&self, package_id: &str, message: &str) {
        self.state
            .lock()
            .objects
            .entry(package_id.to_string())
            .or_default()
            .queued
            .push_back(MockReply::Err(message.to_string()));
    }

    /// Make every object fetch of this package fail.
    pub fn fail_object(&self, package_id: &str, message: &str) {
        self.state
            .lock()
            .objects
            .entry(package_id.to_string())
            .or_default()
            .fallback = Some(MockReply::Err(message.to_string()));
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: MockMethod) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, _)| *m == method)
            .count()
    }

    /// Number of calls made to `method` for `target` (`pkg` or `pkg::module`).
    pub fn calls_for(&self, method: MockMethod, target: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, t)| *m == method && t == target)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn record(&self, method: MockMethod, target: String) {
        self.state.lock().calls.push((method, target));
    }
}

#[async_trait]
impl SuiRpcTransport for MockTransport {
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
        self.record(
            MockMethod::NormalizedModule,
            format!("{}::{}", package_id, module_name),
        );
        self.simulate_latency().await;

        let mut state = self.state.lock();
        let key = (package_id.to_string(), module_name.to_string());
        if let Some(reply) = state.interfaces.get_mut(&key).and_then(Script::next) {
            return reply.into_result();
        }
        state
            .packages
            .get(package_id)
            .and_then(|p| p.modules.get(module_name))
            .cloned()
            .ok_or_else(|| anyhow!("module {}::{} not found", package_id, module_name))
    }

    async fn get_normalized_move_modules_by_package(&self, package_id: &str) -> Result<Value> {
        self.record(MockMethod::ModulesByPackage, package_id.to_string());
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if let Some(reply) = state.module_lists.get_mut(package_id).and_then(Script::next) {
            return reply.into_result();
        }
        let pkg = state
            .packages
            .get(package_id)
            .ok_or_else(|| anyhow!("package object does not exist with ID {}", package_id))?;
        let modules: serde_json::Map<String, Value> = pkg
            .modules
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Value::Object(modules))
    }

    async fn get_package_object(&self, package_id: &str) -> Result<Value> {
        self.record(MockMethod::PackageObject, package_id.to_string());
        self.simulate_latency().await;

        let mut state = self.state.lock();
        if let Some(reply) = state.objects.get_mut(package_id).and_then(Script::next) {
            return reply.into_result();
        }
        let pkg = state
            .packages
            .get(package_id)
            .ok_or_else(|| anyhow!("object {} not found (notExists)", package_id))?;
        Ok(json!({
            "data": {
                "objectId": package_id,
                "version": "1",
                "type": "package",
                "content": {
                    "dataType": "package",
                    "disassembled": pkg.sources,
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_modules_listed() {
        let mock = MockTransport::new()
            .with_module("0x2", "coin")
            .with_module("0x2", "balance");
        let modules = mock
            .get_normalized_move_modules_by_package("0x2")
            .await
            .unwrap();
        let names: Vec<&String> = modules.as_object().unwrap().keys().collect();
        assert_eq!(names, vec!["balance", "coin"]);
        assert_eq!(mock.calls(MockMethod::ModulesByPackage), 1);
    }

    #[tokio::test]
    async fn test_queued_failure_then_fixture() {
        let mock = MockTransport::new().with_module("0x2", "coin");
        mock.push_interface_failure("0x2", "coin", "429 Too Many Requests");

        let first = mock.get_normalized_move_module("0x2", "coin").await;
        assert!(first.unwrap_err().to_string().contains("429"));

        let second = mock.get_normalized_move_module("0x2", "coin").await.unwrap();
        assert_eq!(second["name"], "coin");
        assert_eq!(mock.calls_for(MockMethod::NormalizedModule, "0x2::coin"), 2);
    }

    #[tokio::test]
    async fn test_unknown_package_object_not_found() {
        let mock = MockTransport::new();
        let err = mock.get_package_object("0xabc").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_package_object_carries_disassembly() {
        let mock = MockTransport::new().with_module("0x2", "coin");
        let obj = mock.get_package_object("0x2").await.unwrap();
        let src = obj["data"]["content"]["disassembled"]["coin"].as_str().unwrap();
        assert!(src.starts_with("module 0x2::coin"));
    }
}
