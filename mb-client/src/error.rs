//! Error types for broker and auth calls.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while acquiring an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The token request could not be sent or its body not read.
    #[error("could not acquire access token: {0}")]
    Request(#[from] reqwest::Error),

    /// The token issuer answered with a non-200 status.
    #[error("auth service responded with status code `{status}`: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The token response could not be decoded.
    #[error("could not read token response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Errors raised by [`BrokerClient`](crate::BrokerClient) operations.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// No bearer token could be obtained for the request.
    #[error("could not acquire access token for request: {0}")]
    Auth(#[from] AuthError),

    /// The underlying HTTP client could not be constructed.
    #[error("could not build http client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request could not be sent.
    #[error("failed to send {operation} request to node at `{base_url}`: {source}")]
    Request {
        /// Operation being performed.
        operation: &'static str,
        /// Base URL of the broker instance.
        base_url: String,
        /// Underlying HTTP error.
        #[source]
        source: reqwest::Error,
    },

    /// The broker answered with a status other than the expected one.
    #[error("message broker at `{base_url}` returned unexpected status code ({status}) for {operation}: {body}")]
    UnexpectedStatus {
        /// Operation being performed.
        operation: &'static str,
        /// Base URL of the broker instance.
        base_url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },

    /// The response body of a successful call could not be decoded.
    #[error("could not decode {operation} response from node at `{base_url}`: {source}")]
    Decode {
        /// Operation being performed.
        operation: &'static str,
        /// Base URL of the broker instance.
        base_url: String,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

/// Errors raised while waiting for broker instances to become ready.
#[derive(Debug, Error)]
pub enum ReadinessError {
    /// Not every node reported ready in time.
    #[error("timed out after {waited:?} while waiting for test nodes to get ready")]
    Timeout {
        /// How long we waited.
        waited: Duration,
    },
}
