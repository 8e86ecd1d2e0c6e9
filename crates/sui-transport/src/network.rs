use sui_interface_types::Network;

const MAINNET_RPC: &str = "https://fullnode.mainnet.sui.io:443";
const TESTNET_RPC: &str = "https://fullnode.testnet.sui.io:443";
const DEVNET_RPC: &str = "https://fullnode.devnet.sui.io:443";

/// Environment override for the fullnode JSON-RPC URL.
pub const RPC_URL_ENV: &str = "SUI_RPC_URL";

pub fn default_rpc_endpoint(network: Network) -> &'static str {
    match network {
        Network::Mainnet => MAINNET_RPC,
        Network::Testnet => TESTNET_RPC,
        Network::Devnet => DEVNET_RPC,
    }
}

/// Pick the JSON-RPC URL for `network`.
///
/// An explicit URL wins, then `SUI_RPC_URL`, then the public fullnode.
pub fn resolve_rpc_endpoint(network: Network, explicit: Option<&str>) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    if let Some(value) = sui_interface_types::env_string(RPC_URL_ENV) {
        return value;
    }
    default_rpc_endpoint(network).to_string()
}

/// Network for an endpoint, falling back to `fallback` when the URL does not name one.
pub fn infer_network(rpc_url: &str, fallback: Network) -> Network {
    Network::infer_from_url(rpc_url).unwrap_or(fallback)
}
