//! Subscription teardown and readiness scenarios.

#[cfg(test)]
mod tests {
    use super::super::{fast_run, mock_nodes};
    use crate::{DeliveryMode, HarnessError, Orchestrator};
    use mb_client::{MockNetwork, ReadinessError};

    /// A passing run whose teardown fails is reported as a cleanup error.
    #[tokio::test]
    async fn failed_deletion_after_pass() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.fail_deletions_at("node-1");
        let orchestrator = Orchestrator::new(fast_run(3), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.outcome.is_ok());
        assert!(!report.passed());
        assert_eq!(report.cleanup_failures.len(), 1);
        assert_eq!(report.cleanup_failures[0].base_url, "http://node-1");

        match report.into_result() {
            Err(HarnessError::Cleanup(failures)) => assert_eq!(failures.len(), 1),
            other => panic!("expected cleanup error, got {:?}", other),
        }
    }

    /// Teardown failures never replace the reason a run failed.
    #[tokio::test]
    async fn failed_deletion_does_not_mask_failure() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);
        network.drop_next_deliveries(2);
        network.fail_deletions_at("node-2");
        let orchestrator = Orchestrator::new(fast_run(4), DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        assert_eq!(report.cleanup_failures.len(), 1);
        // node-1's subscription was still deleted.
        assert_eq!(network.deleted_subscriptions().len(), 1);
        assert!(matches!(
            report.into_result(),
            Err(HarnessError::Verification(_))
        ));
    }

    /// With readiness enabled, a node that never gets ready stops the run
    /// before anything is subscribed.
    #[tokio::test]
    async fn readiness_timeout_aborts_before_subscribing() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.set_ready("node-1", false);

        let mut config = fast_run(3);
        config.tuning.readiness.timeout_secs = 1;
        config.tuning.readiness.poll_interval_ms = 50;
        let orchestrator = Orchestrator::new(config, DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(matches!(
            report.outcome,
            Err(HarnessError::Readiness(ReadinessError::Timeout { .. }))
        ));
        assert!(network.active_subscriptions().is_empty());
        assert!(network.deleted_subscriptions().is_empty());
    }

    /// Readiness enabled and every node ready: the run proceeds normally.
    #[tokio::test]
    async fn readiness_then_pass() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);

        let mut config = fast_run(3);
        config.tuning.readiness.timeout_secs = 2;
        config.tuning.readiness.poll_interval_ms = 50;
        let orchestrator = Orchestrator::new(config, DeliveryMode::Broadcast, nodes).unwrap();

        assert!(orchestrator.run().await.passed());
    }
}
