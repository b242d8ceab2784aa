//! Wait for every node to report ready.

use anyhow::{Context, Result};
use mb_client::wait_until_ready;
use std::time::Duration;

use crate::nodes::{connect, load_tuning};
use crate::WaitArgs;

/// Run the wait command.
pub async fn run(args: &WaitArgs) -> Result<()> {
    let tuning = load_tuning(&args.nodes)?;
    let nodes = connect(&args.nodes, &tuning)?;

    tracing::info!(
        "waiting up to {}s for {} node(s) to get ready",
        args.timeout_secs,
        nodes.len()
    );
    wait_until_ready(
        &nodes,
        Duration::from_secs(args.timeout_secs),
        tuning.readiness.poll_interval(),
    )
    .await
    .context("nodes did not become ready")?;

    println!("All {} nodes are ready", nodes.len());
    Ok(())
}
