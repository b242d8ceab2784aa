//! # mb-types
//!
//! Shared types for the message broker delivery test harness.
//!
//! - [`TestMessage`] - The uniquely identifiable payload injected into a broker
//! - [`AnalysisId`], [`NodeId`], [`SubscriptionId`] - Opaque identities used
//!   when talking to a broker instance
//! - [`InvalidId`] - Parse error for blank identifiers

#![warn(missing_docs)]
#![warn(clippy::all)]

mod ids;
mod message;

pub use ids::{AnalysisId, InvalidId, NodeId, SubscriptionId};
pub use message::TestMessage;
