//! Error types for harness runs.

use mb_client::{BrokerError, ReadinessError};
use std::time::Duration;
use thiserror::Error;

use crate::collector::CollectorError;
use crate::config::ConfigError;
use crate::generator::GenerationError;
use crate::orchestrator::CleanupFailure;
use crate::verify::AssertionResult;

/// Why a run did not pass.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The run was misconfigured.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Test messages could not be generated.
    #[error("message generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The result collector could not be set up.
    #[error(transparent)]
    Collector(#[from] CollectorError),

    /// Nodes did not become ready in time.
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    /// A receiving node refused the webhook subscription.
    #[error("could not set up subscription on node `{base_url}`: {source}")]
    Subscription {
        /// Node the subscription was attempted on.
        base_url: String,
        /// Underlying broker error.
        #[source]
        source: BrokerError,
    },

    /// The receiving node's identity could not be discovered.
    #[error("could not discover node id of `{base_url}`: {source}")]
    Discovery {
        /// Node being asked.
        base_url: String,
        /// Underlying broker error.
        #[source]
        source: BrokerError,
    },

    /// A driver task panicked or was cancelled.
    #[error("driver task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The receive task did not finish in time.
    #[error("receiving messages timed out after {waited:?}")]
    ReceiverTimeout {
        /// Bound that expired.
        waited: Duration,
    },

    /// No delivery record was published in time.
    #[error("timed out after {waited:?} while waiting for receive results")]
    ResultTimeout {
        /// Bound that expired.
        waited: Duration,
    },

    /// Messages were lost, duplicated or unexpected.
    #[error("delivery verification failed: {0}")]
    Verification(AssertionResult),

    /// The run passed but subscriptions were left behind.
    #[error("{} subscription(s) could not be deleted", .0.len())]
    Cleanup(Vec<CleanupFailure>),
}
