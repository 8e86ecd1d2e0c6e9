//! Fetch orchestration: validate, consult the cache, fall back to the client.
//!
//! Per cache key a request moves MISS -> FETCHING -> CACHED on success. A
//! failed fetch leaves nothing behind, and an expired entry behaves exactly
//! like a miss.
//!
//! # Example
//!
//! ```ignore
//! let fetcher = FetcherConfig::from_env()?.build();
//! let module = fetcher.fetch_module("0xdee9", "clob_v2", true).await?;
//! println!("{} functions", module.function_names().len());
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::FutureExt;
use futures::stream::{self, StreamExt};
use sui_interface_types::{FetchedModule, Network, SourceStatus};

use crate::cache::{CacheStats, ResultCache, SweeperHandle};
use crate::cancel::CancelToken;
use crate::client::RpcClient;
use crate::error::{FetchError, FetchResult};
use crate::inflight::InFlight;
use crate::validation::{validate_module_name, validate_package_id};

/// Cache holding fetched modules, shared by reference with callers.
pub type ModuleCache = ResultCache<Arc<FetchedModule>>;

/// Default number of modules fetched concurrently by [`ModuleFetcher::fetch_package`].
pub const DEFAULT_PACKAGE_CONCURRENCY: usize = 4;

/// Cache key for a module: `<network>:<packageId>::<moduleName>`.
pub fn cache_key(network: Network, package_id: &str, module_name: &str) -> String {
    format!("{}:{}::{}", network, package_id, module_name)
}

/// Entry point used by the CLI and HTTP layers.
pub struct ModuleFetcher {
    client: RpcClient,
    cache: Arc<ModuleCache>,
    in_flight: Option<InFlight<FetchResult<Arc<FetchedModule>>>>,
    package_concurrency: usize,
    /// Held only so the sweeper stops when the fetcher is dropped.
    _sweeper: Option<SweeperHandle>,
}

impl std::fmt::Debug for ModuleFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleFetcher")
            .field("client", &self.client)
            .field("cache_entries", &self.cache.len())
            .field("coalescing", &self.in_flight.is_some())
            .field("package_concurrency", &self.package_concurrency)
            .field("sweeper", &self._sweeper.is_some())
            .finish()
    }
}

impl ModuleFetcher {
    pub fn new(client: RpcClient, cache: Arc<ModuleCache>) -> Self {
        Self {
            client,
            cache,
            in_flight: None,
            package_concurrency: DEFAULT_PACKAGE_CONCURRENCY,
            _sweeper: None,
        }
    }

    /// Share one upstream execution between concurrent identical `fetch_module` calls.
    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.in_flight = enabled.then(InFlight::new);
        self
    }

    pub fn with_package_concurrency(mut self, concurrency: usize) -> Self {
        self.package_concurrency = concurrency.max(1);
        self
    }

    /// Sweep expired cache entries every `interval` while this fetcher lives.
    /// A zero interval leaves sweeping off.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_sweeper(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            tracing::debug!("zero sweep interval, cache sweeper not started");
            return self;
        }
        self._sweeper = Some(self.cache.spawn_sweeper(interval));
        self
    }

    pub fn has_sweeper(&self) -> bool {
        self._sweeper.is_some()
    }

    pub fn network(&self) -> Network {
        self.client.network()
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Coalesced module fetches still running; always 0 without coalescing.
    pub fn pending_fetches(&self) -> usize {
        self.in_flight.as_ref().map_or(0, InFlight::len)
    }

    /// Fetch one module's interface and, if `include_source`, its disassembly.
    ///
    /// Source is best effort: when it cannot be fetched the module is still
    /// returned with [`SourceStatus::Unavailable`].
    pub async fn fetch_module(
        &self,
        package_id: &str,
        module_name: &str,
        include_source: bool,
    ) -> FetchResult<Arc<FetchedModule>> {
        self.fetch_module_with_cancel(package_id, module_name, include_source, &CancelToken::never())
            .await
    }

    pub async fn fetch_module_with_cancel(
        &self,
        package_id: &str,
        module_name: &str,
        include_source: bool,
        cancel: &CancelToken,
    ) -> FetchResult<Arc<FetchedModule>> {
        validate_package_id(package_id)?;
        validate_module_name(module_name)?;

        let key = cache_key(self.network(), package_id, module_name);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let Some(in_flight) = &self.in_flight else {
            return load_module(
                &self.client,
                &self.cache,
                package_id,
                module_name,
                include_source,
                cancel,
            )
            .await;
        };

        // The shared execution is not tied to any one caller's token; each
        // caller stops waiting on its own cancellation, and the execution is
        // dropped once no caller is left waiting.
        let pending_key = format!("{}#source={}", key, include_source);
        let shared = in_flight.join_or_start(&pending_key, || {
            let client = self.client.clone();
            let cache = Arc::clone(&self.cache);
            let package_id = package_id.to_string();
            let module_name = module_name.to_string();
            async move {
                load_module(
                    &client,
                    &cache,
                    &package_id,
                    &module_name,
                    include_source,
                    &CancelToken::never(),
                )
                .await
            }
            .boxed()
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = shared => result,
        }
    }

    /// Fetch every module of a package.
    ///
    /// Modules that fail are logged and left out; the call only fails when
    /// the package cannot be listed, lists no modules, or is cancelled.
    pub async fn fetch_package(&self, package_id: &str) -> FetchResult<Vec<Arc<FetchedModule>>> {
        self.fetch_package_with_cancel(package_id, &CancelToken::never())
            .await
    }

    pub async fn fetch_package_with_cancel(
        &self,
        package_id: &str,
        cancel: &CancelToken,
    ) -> FetchResult<Vec<Arc<FetchedModule>>> {
        validate_package_id(package_id)?;

        let names = self.client.get_package_module_names(package_id, cancel).await?;
        if names.is_empty() {
            return Err(FetchError::PackageNotFound {
                package_id: package_id.to_string(),
                network: self.network(),
            });
        }

        let total = names.len();
        let outcomes: Vec<(String, FetchResult<Arc<FetchedModule>>)> = stream::iter(names)
            .map(|name| async move {
                let result = self
                    .fetch_module_with_cancel(package_id, &name, true, cancel)
                    .await;
                (name, result)
            })
            .buffered(self.package_concurrency)
            .collect()
            .await;

        let mut modules = Vec::with_capacity(total);
        for (name, result) in outcomes {
            match result {
                Ok(module) => modules.push(module),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) => {
                    tracing::warn!(
                        package_id,
                        module = %name,
                        kind = %e.kind(),
                        "skipping module: {}",
                        e
                    );
                }
            }
        }

        if modules.len() < total {
            tracing::warn!(
                package_id,
                fetched = modules.len(),
                total,
                "package fetched partially"
            );
        }
        Ok(modules)
    }

    /// Module names of a package, sorted.
    pub async fn list_modules(&self, package_id: &str) -> FetchResult<Vec<String>> {
        self.list_modules_with_cancel(package_id, &CancelToken::never())
            .await
    }

    pub async fn list_modules_with_cancel(
        &self,
        package_id: &str,
        cancel: &CancelToken,
    ) -> FetchResult<Vec<String>> {
        validate_package_id(package_id)?;
        self.client.get_package_module_names(package_id, cancel).await
    }

    /// Whether the package exists; never fails with `PackageNotFound`.
    pub async fn package_exists(&self, package_id: &str) -> FetchResult<bool> {
        self.package_exists_with_cancel(package_id, &CancelToken::never())
            .await
    }

    pub async fn package_exists_with_cancel(
        &self,
        package_id: &str,
        cancel: &CancelToken,
    ) -> FetchResult<bool> {
        validate_package_id(package_id)?;
        self.client.package_exists(package_id, cancel).await
    }
}

async fn load_module(
    client: &RpcClient,
    cache: &ModuleCache,
    package_id: &str,
    module_name: &str,
    include_source: bool,
    cancel: &CancelToken,
) -> FetchResult<Arc<FetchedModule>> {
    let normalized_interface = client
        .get_normalized_interface(package_id, module_name, cancel)
        .await?;

    let source = if include_source {
        match client.get_module_source(package_id, module_name, cancel).await {
            Ok(Some(source)) => SourceStatus::Available { source },
            Ok(None) => {
                tracing::warn!(
                    package_id,
                    module = module_name,
                    "package has no disassembled source for module"
                );
                SourceStatus::Unavailable {
                    reason: format!("no disassembled source for module {}", module_name),
                }
            }
            Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
            Err(e) => {
                tracing::warn!(
                    package_id,
                    module = module_name,
                    kind = %e.kind(),
                    "source fetch failed: {}",
                    e
                );
                SourceStatus::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    } else {
        SourceStatus::NotRequested
    };

    let module = Arc::new(FetchedModule {
        package_id: package_id.to_string(),
        module_name: module_name.to_string(),
        network: client.network(),
        normalized_interface,
        source,
        fetched_at: Utc::now(),
    });
    cache.set(
        cache_key(client.network(), package_id, module_name),
        Arc::clone(&module),
    );
    Ok(module)
}
