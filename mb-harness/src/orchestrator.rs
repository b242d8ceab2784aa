//! Test orchestration.
//!
//! One run walks through these phases:
//!
//! 1. generate messages and bind the collector
//! 2. optionally wait for every node to report ready
//! 3. subscribe the collector on every receiving node
//! 4. start serving the collector
//! 5. resolve the send target (dedicated runs ask the receiver for its id)
//! 6. launch the send and receive drivers
//! 7. join the sender, then the receiver (bounded), then await the record
//! 8. verify
//! 9. delete every subscription created in step 3, whatever happened
//!
//! The report keeps the outcome and the cleanup failures apart so that a
//! failed deletion never hides the reason a run failed.

use mb_client::{wait_until_ready, BrokerClient, BrokerError};
use mb_types::{SubscriptionId, TestMessage};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

use crate::collector::ResultCollector;
use crate::config::{ConfigError, RunConfig};
use crate::driver::{spawn_receiver, spawn_sender, DeliveryRecord, SendSummary, SendTarget};
use crate::error::HarnessError;
use crate::generator::generate_messages;
use crate::mode::DeliveryMode;
use crate::verify::{sort_by_id, AssertionResult};

/// A subscription that could not be deleted at the end of a run.
#[derive(Debug)]
pub struct CleanupFailure {
    /// Node holding the subscription.
    pub base_url: String,
    /// The subscription left behind.
    pub subscription_id: SubscriptionId,
    /// Why deletion failed.
    pub source: BrokerError,
}

impl fmt::Display for CleanupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subscription `{}` on `{}`: {}",
            self.subscription_id, self.base_url, self.source
        )
    }
}

/// Everything known about a finished run.
#[derive(Debug)]
pub struct RunReport {
    /// Mode that was run.
    pub mode: DeliveryMode,
    /// Messages handed to the sender, in generation order.
    pub sent: Vec<TestMessage>,
    /// Messages the collector received, in arrival order.
    pub received: Vec<TestMessage>,
    /// Sender statistics, if the sender ran to completion.
    pub send_summary: Option<SendSummary>,
    /// Verification result, or the error that stopped the run.
    pub outcome: Result<AssertionResult, HarnessError>,
    /// Subscriptions that could not be deleted.
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl RunReport {
    fn new(mode: DeliveryMode) -> Self {
        Self {
            mode,
            sent: Vec::new(),
            received: Vec::new(),
            send_summary: None,
            // Replaced before the report leaves the orchestrator.
            outcome: Ok(AssertionResult::pass("not run")),
            cleanup_failures: Vec::new(),
        }
    }

    /// Whether the run passed and cleaned up after itself.
    pub fn passed(&self) -> bool {
        self.outcome.is_ok() && self.cleanup_failures.is_empty()
    }

    /// Collapse into a single result.
    ///
    /// A run error wins over cleanup failures; a passing run with cleanup
    /// failures becomes [`HarnessError::Cleanup`].
    pub fn into_result(self) -> Result<AssertionResult, HarnessError> {
        match self.outcome {
            Err(e) => Err(e),
            Ok(_) if !self.cleanup_failures.is_empty() => {
                Err(HarnessError::Cleanup(self.cleanup_failures))
            }
            Ok(result) => Ok(result),
        }
    }
}

/// Drives one delivery test against a set of broker nodes.
///
/// Node 0 sends; the mode decides which of the others receive.
pub struct Orchestrator<B: BrokerClient + ?Sized + 'static> {
    config: RunConfig,
    mode: DeliveryMode,
    nodes: Vec<Arc<B>>,
}

impl<B: BrokerClient + ?Sized + 'static> fmt::Debug for Orchestrator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.base_url()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<B: BrokerClient + ?Sized + 'static> Orchestrator<B> {
    /// Validate the run. Nothing touches the network until [`run`](Self::run).
    pub fn new(
        config: RunConfig,
        mode: DeliveryMode,
        nodes: Vec<Arc<B>>,
    ) -> Result<Self, ConfigError> {
        if config.message_count == 0 {
            return Err(ConfigError::NoMessages);
        }
        if nodes.len() < mode.min_nodes() {
            return Err(ConfigError::InsufficientNodes {
                mode: mode.name(),
                required: mode.min_nodes(),
                given: nodes.len(),
            });
        }
        config.tuning.validate()?;

        Ok(Self {
            config,
            mode,
            nodes,
        })
    }

    /// Execute the run. Always returns a report; cleanup always happens.
    pub async fn run(&self) -> RunReport {
        tracing::info!(
            "starting {} test: {} messages over {} nodes (analysis {})",
            self.mode,
            self.config.message_count,
            self.nodes.len(),
            self.config.analysis_id
        );

        let mut report = RunReport::new(self.mode);
        let mut subscriptions = Vec::new();

        let outcome = self.execute(&mut report, &mut subscriptions).await;
        report.cleanup_failures = self.cleanup(subscriptions).await;

        match &outcome {
            Ok(result) => tracing::info!("{} test passed: {}", self.mode, result),
            Err(e) => tracing::error!("{} test failed: {}", self.mode, e),
        }
        report.outcome = outcome;
        report
    }

    async fn execute(
        &self,
        report: &mut RunReport,
        subscriptions: &mut Vec<(usize, SubscriptionId)>,
    ) -> Result<AssertionResult, HarnessError> {
        let tuning = &self.config.tuning;
        let analysis_id = &self.config.analysis_id;

        let messages = generate_messages(self.config.message_count, tuning.message_length)?;
        report.sent = messages.into_vec();
        tracing::debug!("generated messages: {:?}", report.sent);

        let collector = ResultCollector::bind(&tuning.collector.bind_address).await?;
        let webhook_url = match tuning.collector.webhook_url() {
            Some(url) => url.to_string(),
            None => collector.local_webhook_url(),
        };

        if let Some(timeout) = tuning.readiness.timeout() {
            tracing::info!("waiting up to {:?} for nodes to get ready", timeout);
            wait_until_ready(&self.nodes, timeout, tuning.readiness.poll_interval()).await?;
        }

        for index in self.mode.receivers(self.nodes.len()) {
            let node = &self.nodes[index];
            let subscription_id = node
                .create_subscription(analysis_id, &webhook_url)
                .await
                .map_err(|source| HarnessError::Subscription {
                    base_url: node.base_url().to_string(),
                    source,
                })?;
            tracing::info!(
                "subscribed `{}` on `{}` as {}",
                webhook_url,
                node.base_url(),
                subscription_id
            );
            subscriptions.push((index, subscription_id));
        }

        let copies = self.mode.expected_copies(self.nodes.len());
        let (tx, rx) = mpsc::channel((report.sent.len() * copies).max(1));
        let collector = collector.start(tx, tuning.collector.handoff_timeout());

        let outcome = self.exchange(report, rx).await;
        collector.shutdown().await;
        outcome
    }

    async fn exchange(
        &self,
        report: &mut RunReport,
        rx: mpsc::Receiver<TestMessage>,
    ) -> Result<AssertionResult, HarnessError> {
        let receive = &self.config.tuning.receive;
        let target = self.resolve_target().await?;

        let (done_tx, done_rx) = oneshot::channel();
        let mut receiver = spawn_receiver(rx, receive.quiescence_window(), done_tx);
        let sender = spawn_sender(
            Arc::clone(&self.nodes[0]),
            self.config.analysis_id.clone(),
            target,
            report.sent.clone(),
        );

        let summary = match sender.await {
            Ok(summary) => summary,
            Err(e) => {
                receiver.abort();
                return Err(e.into());
            }
        };
        report.send_summary = Some(summary);

        match tokio::time::timeout(receive.join_timeout(), &mut receiver).await {
            Ok(joined) => joined?,
            Err(_) => {
                receiver.abort();
                tracing::warn!("receiver did not finish within {:?}", receive.join_timeout());
                return Err(HarnessError::ReceiverTimeout {
                    waited: receive.join_timeout(),
                });
            }
        }

        let record = await_record(done_rx, receive.result_timeout()).await?;
        report.received = record.into_vec();

        let result = self
            .mode
            .verify(&report.sent, &report.received, self.nodes.len());
        if !result.passed {
            tracing::warn!(
                "{}\n  expected: {:?}\n  observed: {:?}",
                result,
                result.expected,
                result.observed
            );
            return Err(HarnessError::Verification(result));
        }
        tracing::debug!("received messages: {:?}", sort_by_id(&report.received));
        Ok(result)
    }

    async fn resolve_target(&self) -> Result<SendTarget, HarnessError> {
        match self.mode {
            DeliveryMode::Broadcast => Ok(SendTarget::Broadcast),
            DeliveryMode::Dedicated => {
                let receiver = &self.nodes[1];
                let node_id = receiver
                    .discover_self(&self.config.analysis_id)
                    .await
                    .map_err(|source| HarnessError::Discovery {
                        base_url: receiver.base_url().to_string(),
                        source,
                    })?;
                tracing::info!("receiver `{}` is node {}", receiver.base_url(), node_id);
                Ok(SendTarget::Node(node_id))
            }
        }
    }

    async fn cleanup(&self, subscriptions: Vec<(usize, SubscriptionId)>) -> Vec<CleanupFailure> {
        let mut failures = Vec::new();

        for (index, subscription_id) in subscriptions {
            let node = &self.nodes[index];
            match node
                .delete_subscription(&self.config.analysis_id, &subscription_id)
                .await
            {
                Ok(()) => tracing::debug!(
                    "deleted subscription {} on `{}`",
                    subscription_id,
                    node.base_url()
                ),
                Err(source) => {
                    tracing::error!(
                        "could not delete subscription {} on `{}`: {}",
                        subscription_id,
                        node.base_url(),
                        source
                    );
                    failures.push(CleanupFailure {
                        base_url: node.base_url().to_string(),
                        subscription_id,
                        source,
                    });
                }
            }
        }

        failures
    }
}

/// Wait for the receiver's record. A dropped sender counts as a timeout.
async fn await_record(
    done: oneshot::Receiver<DeliveryRecord>,
    bound: Duration,
) -> Result<DeliveryRecord, HarnessError> {
    match tokio::time::timeout(bound, done).await {
        Ok(Ok(record)) => Ok(record),
        _ => {
            tracing::warn!("no delivery record within {:?}", bound);
            Err(HarnessError::ResultTimeout { waited: bound })
        }
    }
}
