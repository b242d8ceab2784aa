//! Identity types handed out by (or passed to) a broker instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when parsing a blank identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} must not be blank")]
pub struct InvalidId {
    kind: &'static str,
}

/// Identifier of the analysis (test run) that scopes every broker call.
///
/// Never blank: construct via [`AnalysisId::new`] or [`str::parse`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisId(String);

impl AnalysisId {
    /// Create an AnalysisId, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, InvalidId> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(InvalidId { kind: "analysis id" });
        }
        Ok(Self(value))
    }

    /// Get the raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AnalysisId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalysisId({})", self.0)
    }
}

/// Participant identity of a broker instance within an analysis.
///
/// Obtained through self discovery and only ever used as the recipient of a
/// dedicated message.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Create a NodeId from the value reported by a broker.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Identifier of a webhook subscription registered at a broker instance.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Create a SubscriptionId from the value reported by a broker.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the raw string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_id_rejects_blank() {
        assert!(AnalysisId::new("").is_err());
        assert!(AnalysisId::new("   ").is_err());
        assert_eq!(
            "".parse::<AnalysisId>().unwrap_err().to_string(),
            "analysis id must not be blank"
        );
    }

    #[test]
    fn analysis_id_parses() {
        let id: AnalysisId = "c4b9f1e0-analysis".parse().unwrap();
        assert_eq!(id.as_str(), "c4b9f1e0-analysis");
        assert_eq!(id.to_string(), "c4b9f1e0-analysis");
    }

    #[test]
    fn ids_serialize_transparently() {
        let node = NodeId::new("robot-7");
        assert_eq!(serde_json::to_string(&node).unwrap(), "\"robot-7\"");

        let sub: SubscriptionId = serde_json::from_str("\"sub-1\"").unwrap();
        assert_eq!(sub, SubscriptionId::new("sub-1"));
    }

    #[test]
    fn debug_names_the_type() {
        assert_eq!(format!("{:?}", NodeId::new("n")), "NodeId(n)");
        assert_eq!(
            format!("{:?}", SubscriptionId::new("s")),
            "SubscriptionId(s)"
        );
    }
}
