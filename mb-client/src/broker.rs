//! The broker operations the harness relies on.

use async_trait::async_trait;
use mb_types::{AnalysisId, NodeId, SubscriptionId, TestMessage};

use crate::error::BrokerError;

/// Client for a single message broker instance.
///
/// Every call is attempted exactly once; callers decide whether a failure
/// is fatal. Implementations must be shareable across tasks.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Base URL of the broker's public API, used for logging.
    fn base_url(&self) -> &str;

    /// Register `webhook_url` to receive every message delivered to this
    /// node within the analysis.
    async fn create_subscription(
        &self,
        analysis_id: &AnalysisId,
        webhook_url: &str,
    ) -> Result<SubscriptionId, BrokerError>;

    /// Remove a previously created subscription.
    async fn delete_subscription(
        &self,
        analysis_id: &AnalysisId,
        subscription_id: &SubscriptionId,
    ) -> Result<(), BrokerError>;

    /// Ask the broker for its own participant identity within the analysis.
    async fn discover_self(&self, analysis_id: &AnalysisId) -> Result<NodeId, BrokerError>;

    /// Send a message to exactly one recipient node.
    async fn send_message(
        &self,
        analysis_id: &AnalysisId,
        recipient: &NodeId,
        message: &TestMessage,
    ) -> Result<(), BrokerError>;

    /// Send a message to every other participant of the analysis.
    async fn send_broadcast(
        &self,
        analysis_id: &AnalysisId,
        message: &TestMessage,
    ) -> Result<(), BrokerError>;

    /// Check whether the broker reports itself ready to serve traffic.
    async fn is_ready(&self) -> Result<bool, BrokerError>;
}
