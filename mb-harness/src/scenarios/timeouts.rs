//! Bounded waits on a delivery stream that never settles.

#[cfg(test)]
mod tests {
    use super::super::{fast_run, mock_nodes};
    use crate::{DeliveryMode, HarnessError, Orchestrator};
    use mb_client::MockNetwork;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Redeliveries keep the receiver busy forever; the join bound ends the
    /// run and the subscriptions are still removed.
    #[tokio::test]
    async fn endless_redelivery_hits_join_bound() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 2);
        network.redeliver_every(Duration::from_millis(50));

        let mut config = fast_run(3);
        config.tuning.receive.quiescence_window_ms = 300;
        config.tuning.receive.join_timeout_ms = 600;
        let orchestrator = Orchestrator::new(config, DeliveryMode::Dedicated, nodes).unwrap();

        let started = Instant::now();
        let report = orchestrator.run().await;
        let elapsed = started.elapsed();

        match &report.outcome {
            Err(HarnessError::ReceiverTimeout { waited }) => {
                assert_eq!(*waited, Duration::from_millis(600));
            }
            other => panic!("expected receiver timeout, got {:?}", other),
        }
        assert!(elapsed >= Duration::from_millis(600));
        assert!(elapsed < Duration::from_secs(3), "run took {:?}", elapsed);

        assert_eq!(report.send_summary.unwrap().failed, 0);
        assert!(report.received.is_empty());
        assert!(report.cleanup_failures.is_empty());
        assert!(network.active_subscriptions().is_empty());
        assert_eq!(network.deleted_subscriptions().len(), 1);
    }

    /// Broadcast runs are bounded the same way.
    #[tokio::test]
    async fn endless_broadcast_redelivery_hits_join_bound() {
        let network = MockNetwork::new();
        let nodes = mock_nodes(&network, 3);
        network.redeliver_every(Duration::from_millis(50));

        let mut config = fast_run(2);
        config.tuning.receive.quiescence_window_ms = 300;
        config.tuning.receive.join_timeout_ms = 600;
        let orchestrator = Orchestrator::new(config, DeliveryMode::Broadcast, nodes).unwrap();

        let report = orchestrator.run().await;

        assert!(matches!(
            report.into_result(),
            Err(HarnessError::ReceiverTimeout { .. })
        ));
        assert!(network.active_subscriptions().is_empty());
    }
}
