//! Run a dedicated or broadcast delivery test.

use anyhow::{Context, Result};
use mb_harness::{DeliveryMode, Orchestrator, RunConfig, RunReport};

use crate::nodes::{connect, load_tuning};
use crate::TestArgs;

/// Run the test command.
pub async fn run(mode: DeliveryMode, args: &TestArgs) -> Result<()> {
    let mut tuning = load_tuning(&args.nodes)?;
    if let Some(url) = &args.webhook_url {
        tuning.collector.webhook_url = Some(url.clone());
    }
    if let Some(bind) = &args.collector_bind {
        tuning.collector.bind_address = bind.clone();
    }

    let nodes = connect(&args.nodes, &tuning)?;
    tracing::info!(
        "running {} test for analysis {} against {} node(s)",
        mode,
        args.nodes.analysis_id,
        nodes.len()
    );
    let config = RunConfig::new(
        args.nodes.analysis_id.clone(),
        usize::from(args.number_of_messages_to_send),
    )
    .with_tuning(tuning);

    let orchestrator =
        Orchestrator::new(config, mode, nodes).context("invalid test setup")?;
    let report = orchestrator.run().await;
    print_report(&report);

    let result = report
        .into_result()
        .with_context(|| format!("{} test failed", mode))?;
    println!("{}", result);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("=== {} test ===", report.mode);
    println!("  Sent:     {}", report.sent.len());
    if let Some(summary) = report.send_summary {
        println!("  Rejected: {}", summary.failed);
    }
    println!("  Received: {}", report.received.len());
    for failure in &report.cleanup_failures {
        println!("  Cleanup:  {}", failure);
    }
}
