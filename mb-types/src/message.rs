//! The test message exchanged through the broker under test.

use serde::{Deserialize, Serialize};

/// A uniquely identifiable test message.
///
/// Identity, hashing and ordering are all by `id`. Serialized as
/// `{"id": "..."}`, which is both the payload handed to the broker and the
/// body the broker POSTs back to the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestMessage {
    /// Hex encoded random identifier.
    pub id: String,
}

impl TestMessage {
    /// Create a message with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
