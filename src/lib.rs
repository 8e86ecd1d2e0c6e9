//! Sui Move Interface Fetcher
//!
//! Fetches normalized Move module interfaces (and, best effort, disassembled
//! source) from a Sui fullnode, with validation, bounded retry and an
//! in-memory TTL cache in front of the network:
//!
//! - [`validation`]: syntactic checks on package ids and module names
//! - [`cache`]: TTL- and capacity-bounded [`ResultCache`]
//! - [`client`]: retrying [`RpcClient`] with error classification
//! - [`fetcher`]: the [`ModuleFetcher`] orchestrator
//! - [`config`]: environment-driven [`FetcherConfig`]
//!
//! # Example
//!
//! ```ignore
//! use sui_interface_fetcher::FetcherConfig;
//!
//! let fetcher = FetcherConfig::from_env()?.build();
//! let modules = fetcher.fetch_package("0xdee9").await?;
//! ```

#![allow(clippy::result_large_err)]

pub mod cache;
pub mod cancel;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod inflight;
pub mod logging;
pub mod retry;
pub mod validation;

pub use cache::{CacheConfig, CacheStats, ResultCache, SweeperHandle};
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use classify::{classify_error, CallContext};
pub use client::RpcClient;
pub use config::FetcherConfig;
pub use error::{ErrorKind, FetchError, FetchResult, InputKind};
pub use fetcher::{cache_key, ModuleCache, ModuleFetcher};
pub use retry::{with_retries, RetryPolicy};
pub use validation::{validate_module_name, validate_package_id};

pub use sui_interface_types::{FetchedModule, Network, RetryConfig, SourceStatus};
