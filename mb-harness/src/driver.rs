//! Send and receive drivers.
//!
//! The sender pushes every message through one broker exactly once. The
//! receiver drains the collector channel until it has been quiet for a
//! full window, then publishes what it saw.

use mb_client::BrokerClient;
use mb_types::{AnalysisId, NodeId, TestMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// How the sender addresses each message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// One named recipient.
    Node(NodeId),
    /// Every other participant of the analysis.
    Broadcast,
}

/// Outcome of a send loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendSummary {
    /// Messages the sender tried to send.
    pub attempted: usize,
    /// Sends the broker rejected or that could not be made.
    pub failed: usize,
}

/// Spawn a task that sends each message once, in order.
///
/// A failed send is logged and counted; the loop carries on with the next
/// message.
pub fn spawn_sender<B>(
    client: Arc<B>,
    analysis_id: AnalysisId,
    target: SendTarget,
    messages: Vec<TestMessage>,
) -> JoinHandle<SendSummary>
where
    B: BrokerClient + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut summary = SendSummary::default();

        for message in &messages {
            summary.attempted += 1;
            let result = match &target {
                SendTarget::Node(recipient) => {
                    client.send_message(&analysis_id, recipient, message).await
                }
                SendTarget::Broadcast => client.send_broadcast(&analysis_id, message).await,
            };
            if let Err(e) = result {
                summary.failed += 1;
                tracing::error!("could not send message `{}`: {}", message.id, e);
            }
        }

        tracing::info!(
            "sender on `{}` done: {} attempted, {} failed",
            client.base_url(),
            summary.attempted,
            summary.failed
        );
        summary
    })
}

/// Messages seen by the receive driver. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryRecord {
    messages: Vec<TestMessage>,
}

impl DeliveryRecord {
    /// Number of receipts, counting duplicates.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing was received.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The receipts in arrival order.
    pub fn messages(&self) -> &[TestMessage] {
        &self.messages
    }

    /// Take the receipts out.
    pub fn into_vec(self) -> Vec<TestMessage> {
        self.messages
    }
}

/// Collect messages until none arrives for `window`, or the channel closes.
pub async fn drain_until_quiet(
    receiver: &mut mpsc::Receiver<TestMessage>,
    window: Duration,
) -> DeliveryRecord {
    let mut record = DeliveryRecord::default();

    loop {
        match tokio::time::timeout(window, receiver.recv()).await {
            Ok(Some(message)) => {
                tracing::debug!("received message `{}`", message.id);
                record.messages.push(message);
            }
            Ok(None) => {
                tracing::debug!("result channel closed");
                break;
            }
            Err(_) => {
                tracing::info!(
                    "no message for {:?}, stopping with {} received",
                    window,
                    record.len()
                );
                break;
            }
        }
    }

    record
}

/// Spawn a task that drains `receiver` and publishes the record on `done`.
pub fn spawn_receiver(
    mut receiver: mpsc::Receiver<TestMessage>,
    window: Duration,
    done: oneshot::Sender<DeliveryRecord>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let record = drain_until_quiet(&mut receiver, window).await;
        if done.send(record).is_err() {
            tracing::warn!("delivery record dropped, nobody is waiting for it");
        }
    })
}
