//! Dedicated delivery scenarios.

#[cfg(test)]
mod tests {
    use super::super::{fast_run, mock_nodes};
    use crate::verify::sort_by_id;
    use crate::{DeliveryMode, HarnessError, Orchestrator};
    use mb_client::MockNetwork;

    /// Ten messages from node 0 all arrive at node 1, exactly once.
    #[tokio::test]
    async fn ten_messages_delivered_once() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        let orchestrator = Orchestrator::new(fast_run(10), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.passed(), "{:?}", report.outcome);
        assert_eq!(report.sent.len(), 10);
        assert_eq!(sort_by_id(&report.received), sort_by_id(&report.sent));
        assert_eq!(report.send_summary.unwrap().failed, 0);
        assert!(network.active_subscriptions().is_empty());
        assert_eq!(network.deleted_subscriptions().len(), 1);
    }

    /// An empty webhook URL falls back to the collector's own address.
    #[tokio::test]
    async fn empty_webhook_url_uses_collector_address() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        let mut config = fast_run(3);
        config.tuning.collector.webhook_url = Some(String::new());
        let orchestrator = Orchestrator::new(config, DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.passed(), "{:?}", report.outcome);
        assert_eq!(report.received.len(), 3);
    }

    /// One delivery lost in transit fails verification with 9 of 10.
    #[tokio::test]
    async fn lost_delivery_fails_verification() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.drop_next_deliveries(1);
        let orchestrator = Orchestrator::new(fast_run(10), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert_eq!(report.received.len(), 9);
        match &report.outcome {
            Err(HarnessError::Verification(result)) => {
                assert_eq!(result.expected.len(), 10);
                assert_eq!(result.observed.len(), 9);
                assert!(result
                    .failure_details
                    .as_deref()
                    .unwrap()
                    .contains("expected 10 deliveries, got 9"));
            }
            other => panic!("expected verification failure, got {:?}", other),
        }
        assert!(network.active_subscriptions().is_empty());
    }

    /// A rejected send is counted, the rest still go out, the run fails.
    #[tokio::test]
    async fn rejected_send_is_counted_and_fails_run() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.fail_next_sends(1);
        let orchestrator = Orchestrator::new(fast_run(5), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        let summary = report.send_summary.unwrap();
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.failed, 1);
        assert_eq!(report.received.len(), 4);
        assert!(matches!(report.outcome, Err(HarnessError::Verification(_))));
    }

    /// Discovery failure aborts before sending and still deletes the
    /// receiver's subscription.
    #[tokio::test]
    async fn discovery_failure_cleans_up() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.fail_discovery_at("node-1");
        let orchestrator = Orchestrator::new(fast_run(3), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        match &report.outcome {
            Err(HarnessError::Discovery { base_url, .. }) => assert_eq!(base_url, "http://node-1"),
            other => panic!("expected discovery failure, got {:?}", other),
        }
        assert!(report.send_summary.is_none());
        assert_eq!(network.sent_count(), 0);
        assert!(network.active_subscriptions().is_empty());
        assert_eq!(network.deleted_subscriptions().len(), 1);
    }

    /// Subscription failure on the only receiver leaves nothing to clean.
    #[tokio::test]
    async fn subscription_failure_aborts_run() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.fail_subscriptions_at("node-1");
        let orchestrator = Orchestrator::new(fast_run(3), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(matches!(report.outcome, Err(HarnessError::Subscription { .. })));
        assert!(report.cleanup_failures.is_empty());
        assert!(network.deleted_subscriptions().is_empty());
        assert_eq!(network.sent_count(), 0);
    }

    /// Nodes beyond the first two take no part in a dedicated run.
    #[tokio::test]
    async fn extra_nodes_are_ignored() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 4);
        let orchestrator = Orchestrator::new(fast_run(4), DeliveryMode::Dedicated, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.passed(), "{:?}", report.outcome);
        assert_eq!(report.received.len(), 4);
        assert_eq!(network.deleted_subscriptions().len(), 1);
    }
}
