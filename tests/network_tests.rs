//! Tests against public Sui fullnodes.
//!
//! These tests require network access and are marked with #[ignore].
//! Run with: cargo test --test network_tests -- --ignored

use sui_interface_fetcher::{ErrorKind, FetcherConfig, Network};

/// DeepBook v2 package on mainnet.
const DEEPBOOK: &str = "0xdee9";

fn mainnet_config() -> FetcherConfig {
    FetcherConfig {
        network: Network::Mainnet,
        ..FetcherConfig::default()
    }
}

#[tokio::test]
#[ignore = "requires network access to Sui mainnet"]
async fn test_fetch_deepbook_clob_v2() {
    let fetcher = mainnet_config().build();

    let module = fetcher
        .fetch_module(DEEPBOOK, "clob_v2", true)
        .await
        .expect("Failed to fetch clob_v2");

    assert_eq!(module.network, Network::Mainnet);
    assert!(
        module.function_names().iter().any(|f| f == "place_limit_order"),
        "clob_v2 should expose place_limit_order"
    );
    assert!(
        module.struct_names().iter().any(|s| s == "Pool"),
        "clob_v2 should declare Pool"
    );
    assert!(module.source.is_available(), "source: {:?}", module.source);
}

#[tokio::test]
#[ignore = "requires network access to Sui mainnet"]
async fn test_list_framework_modules() {
    let fetcher = mainnet_config().build();
    let modules = fetcher.list_modules("0x2").await.expect("Failed to list 0x2");
    assert!(modules.contains(&"coin".to_string()));
    assert!(modules.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
#[ignore = "requires network access to Sui mainnet"]
async fn test_missing_package_reported_absent() {
    let mut config = mainnet_config();
    config.retry.retry_not_found = false;
    let fetcher = config.build();

    let exists = fetcher
        .package_exists("0x00000000000000000000000000000000000000000000000000000000deadbeef")
        .await
        .expect("existence check should not fail");
    assert!(!exists);

    let err = fetcher
        .fetch_module(
            "0x00000000000000000000000000000000000000000000000000000000deadbeef",
            "nothing",
            false,
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err.kind(), ErrorKind::ModuleNotFound | ErrorKind::PackageNotFound),
        "unexpected error: {}",
        err
    );
}
