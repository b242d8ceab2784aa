//! Result collector.
//!
//! A small HTTP server that receives messages forwarded by the brokers'
//! webhook subscriptions and hands them to the receive driver through a
//! bounded channel.
//!
//! Status codes matter to the broker: a 4xx is dropped by its forwarder,
//! a 5xx is retried. Malformed bodies therefore get 400, while a handoff
//! that could not complete gets 503.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Router};
use mb_types::TestMessage;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Path the brokers POST received messages to.
pub const RESULT_ENDPOINT_PATH: &str = "/results";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Errors from the result collector.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// The listen socket could not be bound.
    #[error("could not bind result collector to {address}: {source}")]
    Bind {
        /// Requested address.
        address: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[derive(Clone)]
struct Handoff {
    sender: mpsc::Sender<TestMessage>,
    timeout: Duration,
}

/// Build the collector router.
pub fn build_router(sender: mpsc::Sender<TestMessage>, handoff_timeout: Duration) -> Router {
    Router::new()
        .route(RESULT_ENDPOINT_PATH, post(result_handler))
        .layer(Extension(Handoff {
            sender,
            timeout: handoff_timeout,
        }))
}

async fn result_handler(Extension(handoff): Extension<Handoff>, body: Bytes) -> StatusCode {
    let message: TestMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!("could not parse incoming message: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    match handoff.sender.send_timeout(message, handoff.timeout).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!("could not hand off incoming message: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// A bound but not yet serving collector.
#[derive(Debug)]
pub struct ResultCollector {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ResultCollector {
    /// Bind the listen socket.
    pub async fn bind(address: &str) -> Result<Self, CollectorError> {
        let bind_error = |source| CollectorError::Bind {
            address: address.to_string(),
            source,
        };
        let listener = TcpListener::bind(address).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!("result collector bound to {}", local_addr);
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Webhook URL pointing at this collector from the local host.
    ///
    /// Unspecified bind addresses are replaced with loopback.
    pub fn local_webhook_url(&self) -> String {
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            addr.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        format!("http://{}{}", addr, RESULT_ENDPOINT_PATH)
    }

    /// Start serving, handing messages to `sender`.
    pub fn start(
        self,
        sender: mpsc::Sender<TestMessage>,
        handoff_timeout: Duration,
    ) -> CollectorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = build_router(sender, handoff_timeout);
        let local_addr = self.local_addr;

        let task = tokio::spawn(async move {
            let result = axum::serve(self.listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!("result collector on {} failed: {}", local_addr, e);
            }
        });

        CollectorHandle {
            shutdown: shutdown_tx,
            task,
            local_addr,
        }
    }
}

/// Handle to a serving collector.
#[derive(Debug)]
pub struct CollectorHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl CollectorHandle {
    /// Stop accepting connections and wait for the server task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        let mut task = self.task;
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
            tracing::warn!("result collector on {} did not stop in time", self.local_addr);
            task.abort();
        }
        tracing::info!("result collector on {} stopped", self.local_addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn post_results(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(RESULT_ENDPOINT_PATH)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_message_and_hands_off() {
        let (tx, mut rx) = mpsc::channel(4);
        let app = build_router(tx, Duration::from_millis(100));

        let response = app.oneshot(post_results(r#"{"id":"abc"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap(), TestMessage::new("abc"));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (tx, mut rx) = mpsc::channel(4);
        let app = build_router(tx, Duration::from_millis(100));

        let response = app.oneshot(post_results(r#"{"nope":1}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_channel_is_unavailable() {
        let (tx, _rx) = mpsc::channel(1);
        tx.send(TestMessage::new("first")).await.unwrap();
        let app = build_router(tx, Duration::from_millis(20));

        let response = app.oneshot(post_results(r#"{"id":"second"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn closed_channel_is_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let app = build_router(tx, Duration::from_millis(20));

        let response = app.oneshot(post_results(r#"{"id":"x"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let (tx, _rx) = mpsc::channel(1);
        let app = build_router(tx, Duration::from_millis(20));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let collector = ResultCollector::bind("127.0.0.1:0").await.unwrap();
        let url = collector.local_webhook_url();
        assert!(url.ends_with("/results"));

        let (tx, mut rx) = mpsc::channel(4);
        let handle = collector.start(tx, Duration::from_millis(100));

        let response = reqwest::Client::new()
            .post(&url)
            .json(&TestMessage::new("0a"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(rx.recv().await.unwrap(), TestMessage::new("0a"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn bind_failure_names_address() {
        let err = ResultCollector::bind("not-an-address").await.unwrap_err();
        assert!(err.to_string().contains("not-an-address"));
    }
}
