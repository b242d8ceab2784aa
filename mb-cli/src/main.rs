//! # mb-test-cli
//!
//! Runs delivery tests against a set of message broker nodes.
//!
//! ## Commands
//!
//! - `send-dedicated-messages`: node 0 sends to node 1, every message must
//!   arrive exactly once
//! - `send-broadcast-messages`: node 0 broadcasts, every message must arrive
//!   once per other node
//! - `wait-for-nodes`: block until every node reports ready
//!
//! ## Example
//!
//! ```bash
//! mb-test-cli send-dedicated-messages \
//!     --analysis-id my-analysis \
//!     --bootstrap-nodes http://node-a:8080,http://node-b:8080 \
//!     --node-auth-base-url http://keycloak:8080 \
//!     --node-auth-client-id broker \
//!     --node-auth-client-secret "$SECRET" \
//!     --number-of-messages-to-send 10
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use mb_harness::DeliveryMode;
use mb_types::AnalysisId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod nodes;

use commands::{run_test, wait};

/// Delivery tests for the message broker.
#[derive(Parser, Debug)]
#[command(name = "mb-test-cli")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send messages from the first node to the second and verify delivery
    SendDedicatedMessages(TestArgs),

    /// Broadcast messages from the first node and verify every other node
    /// received each one
    SendBroadcastMessages(TestArgs),

    /// Wait until every node reports ready
    WaitForNodes(WaitArgs),
}

/// Flags shared by every command.
#[derive(Args, Debug)]
struct NodeArgs {
    /// Analysis that scopes all broker calls
    #[arg(long)]
    analysis_id: AnalysisId,

    /// Base URLs of the broker nodes; the first one sends
    #[arg(long, required = true, value_delimiter = ',')]
    bootstrap_nodes: Vec<String>,

    /// Management base URLs, one per node (defaults to the node URLs)
    #[arg(long, value_delimiter = ',')]
    bootstrap_management_nodes: Vec<String>,

    /// Base URL of the auth service issuing node tokens
    #[arg(long)]
    node_auth_base_url: String,

    /// Client id used to obtain node tokens
    #[arg(long)]
    node_auth_client_id: String,

    /// Client secret used to obtain node tokens
    #[arg(long)]
    node_auth_client_secret: String,

    /// TOML file with timing and endpoint tuning
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TestArgs {
    #[command(flatten)]
    nodes: NodeArgs,

    /// Number of distinct messages to send
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    number_of_messages_to_send: u16,

    /// URL the brokers should deliver to (overrides the config file; an
    /// empty value derives it from the collector address)
    #[arg(long)]
    webhook_url: Option<String>,

    /// Local address for the result collector (overrides the config file)
    #[arg(long)]
    collector_bind: Option<String>,
}

#[derive(Args, Debug)]
struct WaitArgs {
    #[command(flatten)]
    nodes: NodeArgs,

    /// Give up after this many seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::SendDedicatedMessages(args) => {
            run_test::run(DeliveryMode::Dedicated, &args).await?;
        }
        Commands::SendBroadcastMessages(args) => {
            run_test::run(DeliveryMode::Broadcast, &args).await?;
        }
        Commands::WaitForNodes(args) => {
            wait::run(&args).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}
