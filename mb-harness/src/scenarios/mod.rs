//! End-to-end runs against an in-memory broker network.
//!
//! Every run binds a real collector on loopback and the mock network
//! delivers over HTTP, so these exercise the full path from generator to
//! cleanup with sub-second timings.
//!
//! - `dedicated` - node-to-node delivery
//! - `broadcast` - fan-out delivery and multiplicity
//! - `cleanup` - subscription teardown and readiness
//! - `timeouts` - delivery streams that never go quiet

mod broadcast;
mod cleanup;
mod dedicated;
mod timeouts;

use crate::config::{RunConfig, Tuning};
use mb_client::{MockBrokerClient, MockNetwork};
use mb_types::AnalysisId;
use std::sync::Arc;

/// Tuning with short windows and an ephemeral collector port.
fn fast_tuning() -> Tuning {
    let mut tuning = Tuning::default();
    tuning.message_length = 8;
    tuning.receive.quiescence_window_ms = 300;
    tuning.receive.join_timeout_ms = 3_000;
    tuning.receive.result_timeout_ms = 1_000;
    tuning.collector.bind_address = "127.0.0.1:0".to_string();
    tuning.collector.webhook_url = None;
    tuning.collector.handoff_timeout_ms = 500;
    tuning
}

fn fast_run(message_count: usize) -> RunConfig {
    let analysis_id = AnalysisId::new(format!("analysis-{}", uuid::Uuid::new_v4())).unwrap();
    RunConfig::new(analysis_id, message_count).with_tuning(fast_tuning())
}

fn mock_nodes(network: &MockNetwork, count: usize) -> Vec<Arc<MockBrokerClient>> {
    (0..count)
        .map(|i| Arc::new(network.add_node(&format!("http://node-{i}"), &format!("node-{i}"))))
        .collect()
}
