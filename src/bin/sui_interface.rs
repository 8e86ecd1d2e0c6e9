//! sui-interface: fetch Move module interfaces from a Sui fullnode
//!
//! ## Example Usage
//!
//! ```bash
//! # One module, with disassembled source
//! sui-interface module 0xdee9 clob_v2
//!
//! # Every module of a package, as JSON
//! sui-interface --json package 0xdee9
//!
//! # Module names only, on testnet
//! sui-interface --network testnet modules 0x2
//!
//! # Does the package exist?
//! sui-interface exists 0xdee9
//! ```
//!
//! Configuration is read from `SUI_*` environment variables first; flags
//! given on the command line override them.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sui_interface_fetcher::logging::init_logging;
use sui_interface_fetcher::{FetchError, FetchedModule, FetcherConfig, Network, SourceStatus};

#[derive(Parser, Debug)]
#[command(
    name = "sui-interface",
    author,
    version,
    about = "Fetch normalized Move module interfaces from a Sui fullnode"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network to query (mainnet, testnet, devnet)
    #[arg(long, global = true)]
    network: Option<Network>,

    /// Fullnode JSON-RPC URL (default: public fullnode of --network)
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Log filter when RUST_LOG is unset (e.g. info, debug)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Total attempts per RPC call, including the first
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Delay before the first retry, in milliseconds
    #[arg(long, global = true)]
    retry_base_ms: Option<u64>,

    /// Fail immediately on not-found instead of retrying
    #[arg(long, global = true)]
    no_retry_not_found: bool,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Cache entry lifetime in seconds
    #[arg(long, global = true)]
    cache_ttl_secs: Option<u64>,

    /// Fetch modules of a package this many at a time
    #[arg(long, global = true)]
    concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch one module's interface (and disassembled source)
    Module {
        /// Package ID (0x...)
        #[arg(value_name = "PACKAGE")]
        package_id: String,

        /// Module name
        #[arg(value_name = "MODULE")]
        module_name: String,

        /// Skip the disassembled source
        #[arg(long)]
        no_source: bool,
    },
    /// Fetch every module of a package
    Package {
        /// Package ID (0x...)
        #[arg(value_name = "PACKAGE")]
        package_id: String,
    },
    /// List the module names of a package
    Modules {
        /// Package ID (0x...)
        #[arg(value_name = "PACKAGE")]
        package_id: String,
    },
    /// Check whether a package exists
    Exists {
        /// Package ID (0x...)
        #[arg(value_name = "PACKAGE")]
        package_id: String,
    },
}

impl Cli {
    fn fetcher_config(&self) -> Result<FetcherConfig> {
        let mut config = FetcherConfig::from_env()?;
        if let Some(url) = &self.rpc_url {
            let pinned = self.network.is_some() || FetcherConfig::network_set_in_env();
            config.set_rpc_url(url.clone(), pinned);
        }
        if let Some(network) = self.network {
            config.network = network;
        }
        if let Some(attempts) = self.max_attempts {
            config.retry.max_attempts = attempts;
        }
        if let Some(ms) = self.retry_base_ms {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if self.no_retry_not_found {
            config.retry.retry_not_found = false;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.cache_ttl_secs {
            config.cache.ttl = Duration::from_secs(secs);
        }
        if let Some(n) = self.concurrency {
            config.package_concurrency = n;
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct ModulesOutput<'a> {
    package_id: &'a str,
    network: Network,
    modules: Vec<String>,
}

#[derive(Serialize)]
struct ExistsOutput<'a> {
    package_id: &'a str,
    network: Network,
    exists: bool,
}

#[derive(Serialize)]
struct ErrorJson {
    error: String,
    message: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", format_error(&e, cli.json));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let fetcher = cli.fetcher_config()?.build();
    tracing::info!(network = %fetcher.network(), endpoint = fetcher.client().endpoint(), "fetcher ready");

    match &cli.command {
        Commands::Module {
            package_id,
            module_name,
            no_source,
        } => {
            let module = fetcher
                .fetch_module(package_id, module_name, !no_source)
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&*module)?);
            } else {
                print_module(&module);
            }
        }
        Commands::Package { package_id } => {
            let modules = fetcher.fetch_package(package_id).await?;
            if cli.json {
                let modules: Vec<&FetchedModule> = modules.iter().map(|m| &**m).collect();
                println!("{}", serde_json::to_string_pretty(&modules)?);
            } else {
                for module in &modules {
                    print_module(module);
                    println!();
                }
                println!("Fetched {} modules of {}", modules.len(), package_id);
            }
        }
        Commands::Modules { package_id } => {
            let modules = fetcher.list_modules(package_id).await?;
            if cli.json {
                let out = ModulesOutput {
                    package_id,
                    network: fetcher.network(),
                    modules,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                for name in &modules {
                    println!("{}", name);
                }
            }
        }
        Commands::Exists { package_id } => {
            let exists = fetcher.package_exists(package_id).await?;
            if cli.json {
                let out = ExistsOutput {
                    package_id,
                    network: fetcher.network(),
                    exists,
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", if exists { "yes" } else { "no" });
            }
        }
    }
    Ok(())
}

fn print_module(module: &FetchedModule) {
    println!(
        "\x1b[1m{}::{}\x1b[0m ({})",
        module.package_id, module.module_name, module.network
    );

    let functions = module.function_names();
    println!("  functions: {}", functions.len());
    for name in &functions {
        println!("    {}", name);
    }
    let structs = module.struct_names();
    println!("  structs: {}", structs.len());
    for name in &structs {
        println!("    {}", name);
    }

    match &module.source {
        SourceStatus::Available { source } => {
            println!("  source: {} lines", source.lines().count());
        }
        SourceStatus::Unavailable { reason } => {
            println!("  source: unavailable ({})", reason);
        }
        SourceStatus::NotRequested => {}
    }
}

fn format_error(error: &anyhow::Error, json_output: bool) -> String {
    let kind = error
        .downcast_ref::<FetchError>()
        .map(|e| e.kind().as_str())
        .unwrap_or("config");

    if json_output {
        let err = ErrorJson {
            error: kind.to_string(),
            message: format!("{:#}", error),
        };
        serde_json::to_string_pretty(&err).unwrap_or_else(|_| "{}".to_string())
    } else {
        format!("\x1b[31mError ({}):\x1b[0m {:#}", kind, error)
    }
}
