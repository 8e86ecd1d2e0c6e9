//! Fetcher configuration.
//!
//! Layered as built-in defaults, then environment variables, then whatever
//! the caller (usually the CLI) overrides on the returned struct.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sui_interface_types::env_utils::{
    env_bool_or, env_duration_ms, env_duration_secs, env_string, env_var_or,
};
use sui_interface_types::{Network, RetryConfig};
use sui_transport::{infer_network, resolve_rpc_endpoint, JsonRpcClient};

use crate::cache::{CacheConfig, ResultCache};
use crate::client::RpcClient;
use crate::fetcher::{ModuleFetcher, DEFAULT_PACKAGE_CONCURRENCY};
use crate::retry::RetryPolicy;

pub const NETWORK_ENV: &str = "SUI_NETWORK";

/// Everything needed to build a [`ModuleFetcher`] against a real fullnode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub network: Network,
    /// Explicit endpoint; `None` resolves through `SUI_RPC_URL` and the network default.
    pub rpc_url: Option<String>,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    /// Background sweep of expired entries; `None` disables it.
    pub sweep_interval: Option<Duration>,
    pub coalesce_in_flight: bool,
    pub package_concurrency: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            rpc_url: None,
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            cache: CacheConfig::default(),
            sweep_interval: None,
            coalesce_in_flight: false,
            package_concurrency: DEFAULT_PACKAGE_CONCURRENCY,
        }
    }
}

impl FetcherConfig {
    /// Read configuration from `SUI_*` environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults. An unknown
    /// `SUI_NETWORK` is an error. When `SUI_NETWORK` is unset but
    /// `SUI_RPC_URL` names a known network, that network is used.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let rpc_url = env_string(sui_transport::network::RPC_URL_ENV);

        let network = match env_string(NETWORK_ENV) {
            Some(raw) => raw
                .parse::<Network>()
                .with_context(|| format!("invalid {}", NETWORK_ENV))?,
            None => rpc_url
                .as_deref()
                .map(|url| infer_network(url, defaults.network))
                .unwrap_or(defaults.network),
        };

        let retry = RetryConfig {
            max_attempts: env_var_or("SUI_RPC_MAX_ATTEMPTS", defaults.retry.max_attempts),
            base_delay: env_duration_ms("SUI_RPC_RETRY_BASE_MS", defaults.retry.base_delay),
            max_delay: env_duration_ms("SUI_RPC_RETRY_MAX_MS", defaults.retry.max_delay),
            retry_not_found: env_bool_or("SUI_RPC_RETRY_NOT_FOUND", defaults.retry.retry_not_found),
        };

        let cache = CacheConfig {
            ttl: env_duration_secs("SUI_FETCH_CACHE_TTL_SECS", defaults.cache.ttl),
            max_entries: env_var_or("SUI_FETCH_CACHE_MAX_ENTRIES", defaults.cache.max_entries),
        };

        let sweep_interval = Some(env_duration_secs("SUI_FETCH_CACHE_SWEEP_SECS", Duration::ZERO))
            .filter(|d| !d.is_zero());

        Ok(Self {
            network,
            rpc_url,
            request_timeout: env_duration_secs("SUI_RPC_TIMEOUT_SECS", defaults.request_timeout),
            connect_timeout: env_duration_secs(
                "SUI_RPC_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout,
            ),
            retry,
            cache,
            sweep_interval,
            coalesce_in_flight: env_bool_or("SUI_FETCH_COALESCE", defaults.coalesce_in_flight),
            package_concurrency: env_var_or(
                "SUI_FETCH_PACKAGE_CONCURRENCY",
                defaults.package_concurrency,
            ),
        })
    }

    /// Whether `SUI_NETWORK` names the network explicitly.
    pub fn network_set_in_env() -> bool {
        env_string(NETWORK_ENV).is_some()
    }

    /// Talk to `url`. Unless `network_pinned`, the network follows the URL
    /// when it names a known fullnode and is left alone otherwise.
    pub fn set_rpc_url(&mut self, url: impl Into<String>, network_pinned: bool) {
        let url = url.into();
        if !network_pinned {
            self.network = infer_network(&url, self.network);
        }
        self.rpc_url = Some(url);
    }

    /// Endpoint the fetcher will talk to.
    pub fn resolved_rpc_url(&self) -> String {
        resolve_rpc_endpoint(self.network, self.rpc_url.as_deref())
    }

    /// Build a fetcher backed by the JSON-RPC transport.
    ///
    /// Starting the sweeper requires a tokio runtime, so with a
    /// `sweep_interval` set this must be called from within one.
    pub fn build(&self) -> ModuleFetcher {
        let endpoint = self.resolved_rpc_url();
        tracing::debug!(
            network = %self.network,
            endpoint = %endpoint,
            max_attempts = self.retry.max_attempts,
            cache_ttl_secs = self.cache.ttl.as_secs(),
            "building module fetcher"
        );

        let transport =
            JsonRpcClient::with_timeouts(&endpoint, self.request_timeout, self.connect_timeout);
        let client = RpcClient::new(
            Arc::new(transport),
            self.network,
            RetryPolicy::new(self.retry),
        );
        let fetcher = ModuleFetcher::new(client, Arc::new(ResultCache::new(self.cache)))
            .with_coalescing(self.coalesce_in_flight)
            .with_package_concurrency(self.package_concurrency);

        match self.sweep_interval {
            Some(interval) => fetcher.with_sweeper(interval),
            None => fetcher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};

    // Tests in this module mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = const_mutex(());

    const VARS: &[&str] = &[
        "SUI_NETWORK",
        "SUI_RPC_URL",
        "SUI_RPC_TIMEOUT_SECS",
        "SUI_RPC_CONNECT_TIMEOUT_SECS",
        "SUI_RPC_MAX_ATTEMPTS",
        "SUI_RPC_RETRY_BASE_MS",
        "SUI_RPC_RETRY_MAX_MS",
        "SUI_RPC_RETRY_NOT_FOUND",
        "SUI_FETCH_CACHE_TTL_SECS",
        "SUI_FETCH_CACHE_MAX_ENTRIES",
        "SUI_FETCH_CACHE_SWEEP_SECS",
        "SUI_FETCH_COALESCE",
        "SUI_FETCH_PACKAGE_CONCURRENCY",
    ];

    fn with_env<R>(vars: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let _guard = ENV_LOCK.lock();
        for key in VARS {
            std::env::remove_var(key);
        }
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        let out = f();
        for key in VARS {
            std::env::remove_var(key);
        }
        out
    }

    #[test]
    fn test_defaults_without_env() {
        let (cfg, url) = with_env(&[], || {
            let cfg = FetcherConfig::from_env().unwrap();
            let url = cfg.resolved_rpc_url();
            (cfg, url)
        });
        assert_eq!(cfg, FetcherConfig::default());
        assert_eq!(url, "https://fullnode.mainnet.sui.io:443");
    }

    #[test]
    fn test_env_overrides() {
        let (cfg, url) = with_env(
            &[
                ("SUI_NETWORK", "Testnet"),
                ("SUI_RPC_MAX_ATTEMPTS", "5"),
                ("SUI_RPC_RETRY_BASE_MS", "100"),
                ("SUI_RPC_RETRY_NOT_FOUND", "off"),
                ("SUI_FETCH_CACHE_TTL_SECS", "60"),
                ("SUI_FETCH_CACHE_MAX_ENTRIES", "not-a-number"),
                ("SUI_FETCH_CACHE_SWEEP_SECS", "30"),
                ("SUI_FETCH_COALESCE", "yes"),
            ],
            || {
                let cfg = FetcherConfig::from_env().unwrap();
                let url = cfg.resolved_rpc_url();
                (cfg, url)
            },
        );

        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.base_delay, Duration::from_millis(100));
        assert!(!cfg.retry.retry_not_found);
        assert_eq!(cfg.cache.ttl, Duration::from_secs(60));
        assert_eq!(cfg.cache.max_entries, 1000);
        assert_eq!(cfg.sweep_interval, Some(Duration::from_secs(30)));
        assert!(cfg.coalesce_in_flight);
        assert_eq!(url, "https://fullnode.testnet.sui.io:443");
    }

    #[test]
    fn test_network_inferred_from_rpc_url() {
        let cfg = with_env(
            &[("SUI_RPC_URL", "https://fullnode.devnet.sui.io:443")],
            FetcherConfig::from_env,
        )
        .unwrap();
        assert_eq!(cfg.network, Network::Devnet);
        assert_eq!(cfg.rpc_url.as_deref(), Some("https://fullnode.devnet.sui.io:443"));
    }

    #[test]
    fn test_unknown_network_is_error() {
        let err = with_env(&[("SUI_NETWORK", "localnet")], FetcherConfig::from_env).unwrap_err();
        assert!(format!("{:#}", err).contains("SUI_NETWORK"));
    }

    #[test]
    fn test_explicit_url_wins() {
        let cfg = FetcherConfig {
            rpc_url: Some("http://127.0.0.1:9000".to_string()),
            ..FetcherConfig::default()
        };
        assert_eq!(cfg.resolved_rpc_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_set_rpc_url_infers_unless_pinned() {
        let mut cfg = FetcherConfig::default();
        cfg.set_rpc_url("https://fullnode.testnet.sui.io:443", false);
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.resolved_rpc_url(), "https://fullnode.testnet.sui.io:443");

        cfg.set_rpc_url("http://127.0.0.1:9000", false);
        assert_eq!(cfg.network, Network::Testnet);

        let mut pinned = FetcherConfig::default();
        pinned.set_rpc_url("https://fullnode.devnet.sui.io:443", true);
        assert_eq!(pinned.network, Network::Mainnet);
    }

    #[test]
    fn test_network_set_in_env() {
        assert!(!with_env(&[], FetcherConfig::network_set_in_env));
        assert!(with_env(&[("SUI_NETWORK", "devnet")], FetcherConfig::network_set_in_env));
    }
}
