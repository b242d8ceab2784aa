//! Waiting for broker instances to report ready.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use crate::broker::BrokerClient;
use crate::error::ReadinessError;

/// Poll every client until all of them report ready, or `timeout` elapses.
///
/// Nodes are polled concurrently. Errors and not-ready answers are logged
/// and retried after `poll_interval`; nodes already seen ready are not
/// polled again.
pub async fn wait_until_ready<B>(
    clients: &[Arc<B>],
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ReadinessError>
where
    B: BrokerClient + ?Sized,
{
    let polls = clients.iter().map(|client| async move {
        loop {
            match client.is_ready().await {
                Ok(true) => {
                    tracing::debug!("node at `{}` is ready", client.base_url());
                    return;
                }
                Ok(false) => {
                    tracing::debug!("node at `{}` is not ready yet", client.base_url());
                }
                Err(e) => {
                    tracing::warn!("readiness check for `{}` failed: {}", client.base_url(), e);
                }
            }
            tokio::time::sleep(poll_interval).await;
        }
    });

    tokio::time::timeout(timeout, join_all(polls))
        .await
        .map_err(|_| ReadinessError::Timeout { waited: timeout })?;

    tracing::info!("all {} test nodes are ready", clients.len());
    Ok(())
}
