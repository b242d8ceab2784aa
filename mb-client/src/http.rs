//! [`BrokerClient`] over the broker's public HTTP API.

use async_trait::async_trait;
use mb_types::{AnalysisId, NodeId, SubscriptionId, TestMessage};
use reqwest::{RequestBuilder, Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthClient;
use crate::broker::BrokerClient;
use crate::error::BrokerError;
use crate::wire::{
    BroadcastMessageRequest, CreateSubscriptionRequest, ParticipantResponse, SendMessageRequest,
    SubscriptionResponse,
};

/// Connection settings for one broker instance.
#[derive(Debug, Clone)]
pub struct HttpBrokerConfig {
    /// Base URL of the public API.
    pub base_url: String,
    /// Base URL of the management API. Falls back to `base_url`.
    pub management_base_url: Option<String>,
    /// Timeout applied to every request (default: 300s).
    pub request_timeout: Duration,
}

impl HttpBrokerConfig {
    /// Create a config for the broker at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            management_base_url: None,
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Use a separate management base URL for readiness checks.
    pub fn with_management_base_url(mut self, url: impl Into<String>) -> Self {
        self.management_base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// HTTP client for a single broker instance.
pub struct HttpBrokerClient {
    base_url: String,
    management_base_url: String,
    auth: Arc<dyn AuthClient>,
    http: reqwest::Client,
}

impl fmt::Debug for HttpBrokerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBrokerClient")
            .field("base_url", &self.base_url)
            .field("management_base_url", &self.management_base_url)
            .finish_non_exhaustive()
    }
}

impl HttpBrokerClient {
    /// Create a client. Tokens for every authenticated call come from `auth`.
    pub fn new(config: HttpBrokerConfig, auth: Arc<dyn AuthClient>) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(BrokerError::Build)?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let management_base_url = config
            .management_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url.clone());

        Ok(Self {
            base_url,
            management_base_url,
            auth,
            http,
        })
    }

    /// Base URL of the management API.
    pub fn management_base_url(&self) -> &str {
        &self.management_base_url
    }

    /// URL for creating subscriptions within an analysis.
    pub fn subscriptions_url(&self, analysis_id: &AnalysisId) -> String {
        format!(
            "{}/analyses/{}/messages/subscriptions",
            self.base_url, analysis_id
        )
    }

    /// URL of a single subscription.
    pub fn subscription_url(
        &self,
        analysis_id: &AnalysisId,
        subscription_id: &SubscriptionId,
    ) -> String {
        format!("{}/{}", self.subscriptions_url(analysis_id), subscription_id)
    }

    /// URL of the node's own participant record.
    pub fn self_url(&self, analysis_id: &AnalysisId) -> String {
        format!(
            "{}/analyses/{}/participants/self",
            self.base_url, analysis_id
        )
    }

    /// URL for sending messages to named recipients.
    pub fn messages_url(&self, analysis_id: &AnalysisId) -> String {
        format!("{}/analyses/{}/messages", self.base_url, analysis_id)
    }

    /// URL for broadcasting to all participants.
    pub fn broadcast_url(&self, analysis_id: &AnalysisId) -> String {
        format!("{}/broadcast", self.messages_url(analysis_id))
    }

    /// URL of the readiness endpoint.
    pub fn readiness_url(&self) -> String {
        format!("{}/actuator/health/readiness", self.management_base_url)
    }

    /// Attach a bearer token, send, and require `expected` as the status.
    async fn call(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        expected: StatusCode,
    ) -> Result<Response, BrokerError> {
        let token = self.auth.access_token().await?;

        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| BrokerError::Request {
                operation,
                base_url: self.base_url.clone(),
                source,
            })?;

        if response.status() != expected {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::UnexpectedStatus {
                operation,
                base_url: self.base_url.clone(),
                status,
                body,
            });
        }

        Ok(response)
    }

    fn decode_error(&self, operation: &'static str) -> impl FnOnce(reqwest::Error) -> BrokerError {
        let base_url = self.base_url.clone();
        move |source| BrokerError::Decode {
            operation,
            base_url,
            source,
        }
    }
}

#[async_trait]
impl BrokerClient for HttpBrokerClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_subscription(
        &self,
        analysis_id: &AnalysisId,
        webhook_url: &str,
    ) -> Result<SubscriptionId, BrokerError> {
        const OP: &str = "subscription creation";

        let request = self
            .http
            .post(self.subscriptions_url(analysis_id))
            .json(&CreateSubscriptionRequest { webhook_url });

        let response = self.call(OP, request, StatusCode::CREATED).await?;
        let parsed: SubscriptionResponse =
            response.json().await.map_err(self.decode_error(OP))?;

        Ok(SubscriptionId::new(parsed.subscription_id))
    }

    async fn delete_subscription(
        &self,
        analysis_id: &AnalysisId,
        subscription_id: &SubscriptionId,
    ) -> Result<(), BrokerError> {
        let request = self
            .http
            .delete(self.subscription_url(analysis_id, subscription_id));

        self.call("subscription deletion", request, StatusCode::NO_CONTENT)
            .await?;
        Ok(())
    }

    async fn discover_self(&self, analysis_id: &AnalysisId) -> Result<NodeId, BrokerError> {
        const OP: &str = "self discovery";

        let request = self.http.get(self.self_url(analysis_id));
        let response = self.call(OP, request, StatusCode::OK).await?;
        let parsed: ParticipantResponse = response.json().await.map_err(self.decode_error(OP))?;

        Ok(NodeId::new(parsed.node_id))
    }

    async fn send_message(
        &self,
        analysis_id: &AnalysisId,
        recipient: &NodeId,
        message: &TestMessage,
    ) -> Result<(), BrokerError> {
        let request = self
            .http
            .post(self.messages_url(analysis_id))
            .json(&SendMessageRequest {
                recipients: [recipient],
                message,
            });

        self.call("message send", request, StatusCode::ACCEPTED)
            .await?;
        Ok(())
    }

    async fn send_broadcast(
        &self,
        analysis_id: &AnalysisId,
        message: &TestMessage,
    ) -> Result<(), BrokerError> {
        let request = self
            .http
            .post(self.broadcast_url(analysis_id))
            .json(&BroadcastMessageRequest { message });

        self.call("broadcast send", request, StatusCode::ACCEPTED)
            .await?;
        Ok(())
    }

    async fn is_ready(&self) -> Result<bool, BrokerError> {
        let response = self
            .http
            .get(self.readiness_url())
            .send()
            .await
            .map_err(|source| BrokerError::Request {
                operation: "readiness check",
                base_url: self.base_url.clone(),
                source,
            })?;

        Ok(response.status() == StatusCode::OK)
    }
}
