//! Sui Transport Layer
//!
//! Network transport for reading Move package data from a Sui fullnode.
//!
//! This crate provides:
//! - [`transport`]: the [`SuiRpcTransport`] trait the fetcher is written against
//! - [`jsonrpc`]: a JSON-RPC 2.0 implementation over HTTP
//! - [`network`]: per-network endpoint defaults and resolution
//! - [`test_utils`]: a scriptable in-memory transport
//!
//! # Example
//!
//! ```ignore
//! use sui_transport::{JsonRpcClient, SuiRpcTransport};
//! use sui_interface_types::Network;
//!
//! let client = JsonRpcClient::for_network(Network::Mainnet);
//! let modules = client.get_normalized_move_modules_by_package("0x2").await?;
//! ```

pub mod jsonrpc;
pub mod network;
pub mod test_utils;
pub mod transport;

// Re-export main types for convenience
pub use jsonrpc::JsonRpcClient;
pub use network::{default_rpc_endpoint, infer_network, resolve_rpc_endpoint};
pub use transport::SuiRpcTransport;
