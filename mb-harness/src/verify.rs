//! Delivery verification.
//!
//! Pure functions over sent and received messages. The delivery record is a
//! multiset, so checks group by id instead of pairing positions.

use mb_types::TestMessage;
use std::collections::BTreeMap;
use std::fmt;

/// Result of a delivery check.
#[derive(Debug, Clone)]
pub struct AssertionResult {
    /// Whether the assertion passed
    pub passed: bool,
    /// Description of what was checked
    pub description: String,
    /// Details on failure
    pub failure_details: Option<String>,
    /// Expected ids, ascending, with multiplicity
    pub expected: Vec<String>,
    /// Observed ids, ascending, with multiplicity
    pub observed: Vec<String>,
}

impl AssertionResult {
    /// Create a passing result.
    pub fn pass(description: &str) -> Self {
        Self {
            passed: true,
            description: description.into(),
            failure_details: None,
            expected: Vec::new(),
            observed: Vec::new(),
        }
    }

    /// Create a failing result.
    pub fn fail(description: &str, details: &str) -> Self {
        Self {
            passed: false,
            description: description.into(),
            failure_details: Some(details.into()),
            expected: Vec::new(),
            observed: Vec::new(),
        }
    }

    fn with_sequences(mut self, expected: Vec<String>, observed: Vec<String>) -> Self {
        self.expected = expected;
        self.observed = observed;
        self
    }
}

impl fmt::Display for AssertionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.failure_details {
            None => write!(f, "PASS: {}", self.description),
            Some(details) => write!(f, "FAIL: {} ({})", self.description, details),
        }
    }
}

/// Sort messages ascending by id.
pub fn sort_by_id(messages: &[TestMessage]) -> Vec<TestMessage> {
    let mut sorted = messages.to_vec();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    sorted
}

/// Assert that `received` holds every message of `sent` exactly `copies`
/// times and nothing else.
pub fn assert_delivery(
    sent: &[TestMessage],
    received: &[TestMessage],
    copies: usize,
) -> AssertionResult {
    let description = format!(
        "{} sent messages delivered {} time(s) each",
        sent.len(),
        copies
    );

    let expected: Vec<String> = sort_by_id(sent)
        .into_iter()
        .flat_map(|m| std::iter::repeat(m.id).take(copies))
        .collect();
    let observed: Vec<String> = sort_by_id(received).into_iter().map(|m| m.id).collect();

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for message in received {
        *counts.entry(message.id.as_str()).or_default() += 1;
    }

    let mut problems = Vec::new();

    if observed.len() != expected.len() {
        problems.push(format!(
            "expected {} deliveries, got {}",
            expected.len(),
            observed.len()
        ));
    }

    for message in sent {
        let seen = counts.remove(message.id.as_str()).unwrap_or(0);
        if seen != copies {
            problems.push(format!("{}: expected {}, got {}", message.id, copies, seen));
        }
    }

    for (id, seen) in counts {
        problems.push(format!("{}: not sent, got {}", id, seen));
    }

    let result = if problems.is_empty() {
        AssertionResult::pass(&description)
    } else {
        AssertionResult::fail(&description, &problems.join("; "))
    };
    result.with_sequences(expected, observed)
}
