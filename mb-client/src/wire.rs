//! JSON bodies of the broker and token endpoints.

use mb_types::{NodeId, TestMessage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateSubscriptionRequest<'a> {
    pub webhook_url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionResponse {
    pub subscription_id: String,
    #[allow(dead_code)]
    pub analysis_id: Option<String>,
    #[allow(dead_code)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ParticipantResponse {
    pub node_id: String,
    #[allow(dead_code)]
    pub node_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub recipients: [&'a NodeId; 1],
    pub message: &'a TestMessage,
}

#[derive(Debug, Serialize)]
pub(crate) struct BroadcastMessageRequest<'a> {
    pub message: &'a TestMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds; absent for issuers that don't report it.
    #[serde(default)]
    pub expires_in: Option<u64>,
}
