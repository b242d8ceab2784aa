//! # mb-harness
//!
//! End-to-end delivery tests for the message broker.
//!
//! A run generates uniquely identifiable messages, sends them through one
//! broker node and checks that the other nodes' webhook subscriptions
//! deliver every message the expected number of times:
//!
//! - [`DeliveryMode::Dedicated`] - node 0 sends to node 1 by node id, each
//!   message must arrive exactly once
//! - [`DeliveryMode::Broadcast`] - node 0 broadcasts, each message must
//!   arrive once per receiving node
//!
//! ```ignore
//! let config = RunConfig::new(analysis_id, 10).with_tuning(tuning);
//! let orchestrator = Orchestrator::new(config, DeliveryMode::Dedicated, nodes)?;
//! let report = orchestrator.run().await;
//! report.into_result()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod config;
pub mod driver;
mod error;
pub mod generator;
pub mod mode;
pub mod orchestrator;
pub mod verify;

#[cfg(test)]
mod scenarios;

pub use config::{ConfigError, RunConfig, Tuning};
pub use error::HarnessError;
pub use mode::DeliveryMode;
pub use orchestrator::{CleanupFailure, Orchestrator, RunReport};
pub use verify::AssertionResult;
