/*!

This is the command line interface for creating and destroying a local `k3d` development cluster
and bootstrapping flux onto it.

!*/

mod create;
mod destroy;
mod status;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use homelab_core::config::DEFAULT_CLUSTER_NAME;
use homelab_core::{MatchMode, SystemRunner, Tools};
use log::LevelFilter;

/// Provision and decommission a local k3d cluster managed by flux.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info", global = true)]
    log_level: LevelFilter,

    /// The name of the cluster.
    #[clap(long = "name", default_value = DEFAULT_CLUSTER_NAME, global = true)]
    name: String,

    /// How the cluster name is found in the cluster list [exact|substring]. `substring` also
    /// matches clusters whose names merely contain the name and is only kept for compatibility.
    #[clap(long = "match-mode", default_value = "exact", global = true)]
    match_mode: MatchMode,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Create the cluster if needed, merge its credentials and bootstrap flux.
    Create(create::Create),
    /// Delete the cluster if it exists.
    Destroy(destroy::Destroy),
    /// Check whether the cluster exists.
    Status(status::Status),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        // The first cause carries the external tool's output.
        match e.chain().nth(1) {
            Some(cause) => eprintln!("{}: {}", e, cause),
            None => eprintln!("{}", e),
        }
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let tools = Tools::from_env().context("Unable to read tool settings")?;
    let runner = SystemRunner;
    match args.command {
        Command::Create(create) => create.run(&runner, &tools, args.name, args.match_mode).await,
        Command::Destroy(destroy) => {
            destroy
                .run(&runner, &tools, &args.name, args.match_mode)
                .await
        }
        Command::Status(status) => status.run(&runner, &tools, &args.name, args.match_mode).await,
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use default log level for our crates only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("homelab_core"), level)
                .init();
        }
    }
}
