//! Delivery modes.
//!
//! A mode decides how many nodes a run needs, which of them receive, how
//! the sender addresses its messages and how many copies each receiver
//! side should collect. Node 0 is always the sender.

use mb_types::TestMessage;

use crate::verify::{assert_delivery, AssertionResult};

/// Which broker send path a run exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Node 0 sends to node 1 by node id.
    Dedicated,
    /// Node 0 broadcasts to every other participant.
    Broadcast,
}

impl DeliveryMode {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            DeliveryMode::Dedicated => "dedicated",
            DeliveryMode::Broadcast => "broadcast",
        }
    }

    /// Minimum number of nodes the mode needs.
    pub fn min_nodes(&self) -> usize {
        match self {
            DeliveryMode::Dedicated => 2,
            DeliveryMode::Broadcast => 3,
        }
    }

    /// Indices of the receiving nodes among `node_count` nodes.
    ///
    /// Dedicated runs only use node 1; further nodes are ignored.
    pub fn receivers(&self, node_count: usize) -> std::ops::Range<usize> {
        match self {
            DeliveryMode::Dedicated => 1..node_count.min(2),
            DeliveryMode::Broadcast => 1..node_count.max(1),
        }
    }

    /// How often each sent message should be received.
    pub fn expected_copies(&self, node_count: usize) -> usize {
        self.receivers(node_count).len()
    }

    /// Check the delivery record against what was sent.
    pub fn verify(
        &self,
        sent: &[TestMessage],
        received: &[TestMessage],
        node_count: usize,
    ) -> AssertionResult {
        assert_delivery(sent, received, self.expected_copies(node_count))
    }
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
