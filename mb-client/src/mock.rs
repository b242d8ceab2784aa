//! In-memory broker network for testing.
//!
//! Every [`MockBrokerClient`] created from the same [`MockNetwork`] shares
//! one routing table. Sent messages are POSTed to the webhooks of matching
//! subscriptions over real HTTP, so a harness run against the mock exercises
//! the same collector path it uses against real brokers.

use async_trait::async_trait;
use mb_types::{AnalysisId, NodeId, SubscriptionId, TestMessage};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::broker::BrokerClient;
use crate::error::BrokerError;

/// A simulated set of broker instances with fault injection.
#[derive(Clone)]
pub struct MockNetwork {
    inner: Arc<Mutex<MockNetworkInner>>,
    http: reqwest::Client,
}

#[derive(Default)]
struct MockNetworkInner {
    nodes: Vec<MockNode>,
    next_subscription: u64,
    deleted: Vec<SubscriptionId>,
    sent: usize,
    fail_next_sends: usize,
    drop_next_deliveries: usize,
    redeliver_every: Option<Duration>,
}

struct MockNode {
    base_url: String,
    node_id: NodeId,
    ready: bool,
    fail_subscription: bool,
    fail_deletion: bool,
    fail_discovery: bool,
    subscriptions: Vec<MockSubscription>,
}

struct MockSubscription {
    id: SubscriptionId,
    analysis_id: AnalysisId,
    webhook_url: String,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNetwork {
    /// Create an empty network.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockNetworkInner::default())),
            http: reqwest::Client::new(),
        }
    }

    /// Add a ready node and return a client bound to it.
    pub fn add_node(&self, base_url: &str, node_id: &str) -> MockBrokerClient {
        let mut inner = self.inner.lock().unwrap();
        inner.nodes.push(MockNode {
            base_url: base_url.to_string(),
            node_id: NodeId::new(node_id),
            ready: true,
            fail_subscription: false,
            fail_deletion: false,
            fail_discovery: false,
            subscriptions: Vec::new(),
        });
        MockBrokerClient {
            network: self.clone(),
            base_url: base_url.to_string(),
            node_id: NodeId::new(node_id),
        }
    }

    /// Make subscription creation on `node_id` fail.
    pub fn fail_subscriptions_at(&self, node_id: &str) {
        self.with_node(node_id, |node| node.fail_subscription = true);
    }

    /// Make subscription deletion on `node_id` fail.
    pub fn fail_deletions_at(&self, node_id: &str) {
        self.with_node(node_id, |node| node.fail_deletion = true);
    }

    /// Make self discovery on `node_id` fail.
    pub fn fail_discovery_at(&self, node_id: &str) {
        self.with_node(node_id, |node| node.fail_discovery = true);
    }

    /// Set what `node_id` answers to readiness checks.
    pub fn set_ready(&self, node_id: &str, ready: bool) {
        self.with_node(node_id, |node| node.ready = ready);
    }

    /// Reject the next `n` sends (dedicated or broadcast) with a 500.
    pub fn fail_next_sends(&self, n: usize) {
        self.inner.lock().unwrap().fail_next_sends = n;
    }

    /// Accept but silently lose the next `n` webhook deliveries.
    pub fn drop_next_deliveries(&self, n: usize) {
        self.inner.lock().unwrap().drop_next_deliveries = n;
    }

    /// Keep re-delivering every message every `interval` for as long as the
    /// subscription it was delivered through exists.
    pub fn redeliver_every(&self, interval: Duration) {
        self.inner.lock().unwrap().redeliver_every = Some(interval);
    }

    /// Subscriptions that are still registered, across all nodes.
    pub fn active_subscriptions(&self) -> Vec<SubscriptionId> {
        let inner = self.inner.lock().unwrap();
        inner
            .nodes
            .iter()
            .flat_map(|node| node.subscriptions.iter().map(|s| s.id.clone()))
            .collect()
    }

    /// Subscriptions that were deleted, in deletion order.
    pub fn deleted_subscriptions(&self) -> Vec<SubscriptionId> {
        self.inner.lock().unwrap().deleted.clone()
    }

    /// Number of sends accepted so far.
    pub fn sent_count(&self) -> usize {
        self.inner.lock().unwrap().sent
    }

    fn is_subscribed(&self, subscription_id: &SubscriptionId) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .nodes
            .iter()
            .any(|node| node.subscriptions.iter().any(|s| &s.id == subscription_id))
    }

    fn with_node(&self, node_id: &str, f: impl FnOnce(&mut MockNode)) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(node) = inner.nodes.iter_mut().find(|n| n.node_id.as_str() == node_id) {
            f(node);
        }
    }

    /// Pick the webhook targets for one send, applying injected faults.
    fn route(
        &self,
        sender: &MockBrokerClient,
        analysis_id: &AnalysisId,
        recipient: Option<&NodeId>,
    ) -> Result<Vec<(SubscriptionId, String)>, BrokerError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.fail_next_sends > 0 {
            inner.fail_next_sends -= 1;
            return Err(sender.status_error("message send", 500, "injected send failure"));
        }

        if let Some(recipient) = recipient {
            if !inner.nodes.iter().any(|n| &n.node_id == recipient) {
                return Err(sender.status_error(
                    "message send",
                    400,
                    &format!("unknown recipient {recipient}"),
                ));
            }
        }

        inner.sent += 1;

        let targets: Vec<(SubscriptionId, String)> = inner
            .nodes
            .iter()
            .filter(|n| match recipient {
                Some(recipient) => &n.node_id == recipient,
                None => n.node_id != sender.node_id,
            })
            .flat_map(|n| n.subscriptions.iter())
            .filter(|s| &s.analysis_id == analysis_id)
            .map(|s| (s.id.clone(), s.webhook_url.clone()))
            .collect();

        let mut kept = Vec::with_capacity(targets.len());
        for (subscription_id, url) in targets {
            if inner.drop_next_deliveries > 0 {
                inner.drop_next_deliveries -= 1;
                tracing::debug!("mock network dropping delivery to {}", url);
            } else {
                kept.push((subscription_id, url));
            }
        }
        Ok(kept)
    }

    async fn deliver(&self, targets: Vec<(SubscriptionId, String)>, message: &TestMessage) {
        let redeliver_every = self.inner.lock().unwrap().redeliver_every;

        for (subscription_id, url) in targets {
            self.post(&url, message).await;

            if let Some(interval) = redeliver_every {
                let network = self.clone();
                let message = message.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::time::sleep(interval).await;
                        if !network.is_subscribed(&subscription_id) {
                            break;
                        }
                        network.post(&url, &message).await;
                    }
                });
            }
        }
    }

    async fn post(&self, url: &str, message: &TestMessage) {
        match self.http.post(url).json(message).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!("webhook {} answered {}", url, response.status());
            }
            Err(e) => tracing::warn!("webhook {} unreachable: {}", url, e),
        }
    }
}

/// A [`BrokerClient`] for one node of a [`MockNetwork`].
#[derive(Clone)]
pub struct MockBrokerClient {
    network: MockNetwork,
    base_url: String,
    node_id: NodeId,
}

impl std::fmt::Debug for MockBrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrokerClient")
            .field("base_url", &self.base_url)
            .field("node_id", &self.node_id)
            .finish()
    }
}

impl MockBrokerClient {
    /// The node id this client reports from `discover_self`.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn status_error(&self, operation: &'static str, status: u16, body: &str) -> BrokerError {
        BrokerError::UnexpectedStatus {
            operation,
            base_url: self.base_url.clone(),
            status,
            body: body.to_string(),
        }
    }
}

#[async_trait]
impl BrokerClient for MockBrokerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_subscription(
        &self,
        analysis_id: &AnalysisId,
        webhook_url: &str,
    ) -> Result<SubscriptionId, BrokerError> {
        let mut inner = self.network.inner.lock().unwrap();
        inner.next_subscription += 1;
        let id = SubscriptionId::new(format!("sub-{}", inner.next_subscription));

        let node = inner
            .nodes
            .iter_mut()
            .find(|n| n.node_id == self.node_id)
            .ok_or_else(|| self.status_error("subscription creation", 404, "unknown node"))?;

        if node.fail_subscription {
            return Err(self.status_error("subscription creation", 500, "injected failure"));
        }

        node.subscriptions.push(MockSubscription {
            id: id.clone(),
            analysis_id: analysis_id.clone(),
            webhook_url: webhook_url.to_string(),
        });
        Ok(id)
    }

    async fn delete_subscription(
        &self,
        _analysis_id: &AnalysisId,
        subscription_id: &SubscriptionId,
    ) -> Result<(), BrokerError> {
        let mut inner = self.network.inner.lock().unwrap();

        let node = inner
            .nodes
            .iter_mut()
            .find(|n| n.node_id == self.node_id)
            .ok_or_else(|| self.status_error("subscription deletion", 404, "unknown node"))?;

        if node.fail_deletion {
            return Err(self.status_error("subscription deletion", 500, "injected failure"));
        }

        let before = node.subscriptions.len();
        node.subscriptions.retain(|s| &s.id != subscription_id);
        if node.subscriptions.len() == before {
            return Err(self.status_error("subscription deletion", 404, "no such subscription"));
        }

        inner.deleted.push(subscription_id.clone());
        Ok(())
    }

    async fn discover_self(&self, _analysis_id: &AnalysisId) -> Result<NodeId, BrokerError> {
        let inner = self.network.inner.lock().unwrap();
        match inner.nodes.iter().find(|n| n.node_id == self.node_id) {
            Some(node) if node.fail_discovery => {
                Err(self.status_error("self discovery", 500, "injected failure"))
            }
            Some(node) => Ok(node.node_id.clone()),
            None => Err(self.status_error("self discovery", 404, "unknown node")),
        }
    }

    async fn send_message(
        &self,
        analysis_id: &AnalysisId,
        recipient: &NodeId,
        message: &TestMessage,
    ) -> Result<(), BrokerError> {
        let targets = self.network.route(self, analysis_id, Some(recipient))?;
        self.network.deliver(targets, message).await;
        Ok(())
    }

    async fn send_broadcast(
        &self,
        analysis_id: &AnalysisId,
        message: &TestMessage,
    ) -> Result<(), BrokerError> {
        let targets = self.network.route(self, analysis_id, None)?;
        self.network.deliver(targets, message).await;
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool, BrokerError> {
        let inner = self.network.inner.lock().unwrap();
        Ok(inner
            .nodes
            .iter()
            .any(|n| n.node_id == self.node_id && n.ready))
    }
}
