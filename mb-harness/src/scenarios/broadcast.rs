//! Broadcast delivery scenarios.

#[cfg(test)]
mod tests {
    use super::super::{fast_run, mock_nodes};
    use crate::{DeliveryMode, HarnessError, Orchestrator};
    use mb_client::MockNetwork;
    use std::collections::HashMap;

    /// Ten broadcasts over three nodes arrive twice each, 20 in total.
    #[tokio::test]
    async fn ten_broadcasts_arrive_twice() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);
        let orchestrator = Orchestrator::new(fast_run(10), DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.passed(), "{:?}", report.outcome);
        assert_eq!(report.received.len(), 20);

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for message in &report.received {
            *counts.entry(message.id.as_str()).or_default() += 1;
        }
        assert_eq!(counts.len(), 10);
        assert!(counts.values().all(|&n| n == 2));
        assert_eq!(network.deleted_subscriptions().len(), 2);
    }

    /// One lost copy (19 of 20) fails the run.
    #[tokio::test]
    async fn one_lost_copy_fails() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);
        network.drop_next_deliveries(1);
        let orchestrator = Orchestrator::new(fast_run(10), DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        assert_eq!(report.received.len(), 19);
        match &report.outcome {
            Err(HarnessError::Verification(result)) => {
                assert_eq!(result.expected.len(), 20);
                assert_eq!(result.observed.len(), 19);
                assert!(result
                    .failure_details
                    .as_deref()
                    .unwrap()
                    .contains("expected 2, got 1"));
            }
            other => panic!("expected verification failure, got {:?}", other),
        }
        assert!(network.active_subscriptions().is_empty());
    }

    /// Multiplicity follows the number of receiving nodes.
    #[tokio::test]
    async fn four_nodes_means_three_copies() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 4);
        let orchestrator = Orchestrator::new(fast_run(5), DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(report.passed(), "{:?}", report.outcome);
        assert_eq!(report.received.len(), 15);
    }

    /// A failing second subscription still removes the first one.
    #[tokio::test]
    async fn partial_subscription_is_rolled_back() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);
        network.fail_subscriptions_at("node-2");
        let orchestrator = Orchestrator::new(fast_run(3), DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        match &report.outcome {
            Err(HarnessError::Subscription { base_url, .. }) => {
                assert_eq!(base_url, "http://node-2")
            }
            other => panic!("expected subscription failure, got {:?}", other),
        }
        assert_eq!(network.deleted_subscriptions().len(), 1);
        assert!(network.active_subscriptions().is_empty());
        assert_eq!(network.sent_count(), 0);
    }
}
