//! # mb-client
//!
//! Client side of the message broker's public HTTP API.
//!
//! The harness only depends on the [`BrokerClient`] and [`AuthClient`]
//! traits. Two implementations ship with this crate:
//!
//! - [`HttpBrokerClient`] + [`OidcAuthClient`] talk to real broker instances
//!   and obtain bearer tokens through the client-credentials flow.
//! - [`MockNetwork`] simulates a set of brokers in memory and delivers sent
//!   messages to registered webhooks over real HTTP, with fault injection.
//!
//! ```ignore
//! let auth = Arc::new(OidcAuthClient::new(OidcConfig::new(auth_url, id, secret))?);
//! let node = HttpBrokerClient::new(HttpBrokerConfig::new("http://node-a:8080"), auth)?;
//! let subscription = node.create_subscription(&analysis, webhook_url).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod auth;
mod broker;
mod error;
mod http;
mod mock;
mod readiness;
mod wire;

pub use auth::{AuthClient, OidcAuthClient, OidcConfig, StaticToken};
pub use broker::BrokerClient;
pub use error::{AuthError, BrokerError, ReadinessError};
pub use http::{HttpBrokerClient, HttpBrokerConfig};
pub use mock::{MockBrokerClient, MockNetwork};
pub use readiness::wait_until_ready;
