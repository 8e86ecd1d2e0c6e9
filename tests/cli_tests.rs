//! CLI tests that need no network: every case fails before the first RPC.

use assert_cmd::Command;
use predicates::prelude::*;

fn sui_interface() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("sui-interface").unwrap();
    cmd.env_remove("RUST_LOG")
        .env_remove("SUI_NETWORK")
        .env_remove("SUI_RPC_URL");
    cmd
}

#[test]
fn test_invalid_package_id_json_error() {
    let output = sui_interface()
        .args(["--json", "module", "dee9", "clob_v2"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());

    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"], "input_validation");
    assert!(err["message"].as_str().unwrap().contains("dee9"));
}

#[test]
fn test_invalid_module_name_text_error() {
    sui_interface()
        .args(["module", "0xdee9", "2clob"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("input_validation"))
        .stderr(predicate::str::contains("invalid module name"));
}

#[test]
fn test_invalid_network_env_is_config_error() {
    sui_interface()
        .env("SUI_NETWORK", "localnet")
        .args(["--json", "exists", "0x2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\": \"config\""))
        .stderr(predicate::str::contains("localnet"));
}

#[test]
fn test_unknown_network_flag_rejected() {
    sui_interface()
        .args(["--network", "localnet", "modules", "0x2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown network"));
}

#[test]
fn test_help_lists_subcommands() {
    sui_interface()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("module"))
        .stdout(predicate::str::contains("package"))
        .stdout(predicate::str::contains("exists"));
}
