//! Run configuration and tuning.
//!
//! Tuning is loaded from an optional TOML file; every field has a default,
//! so an empty file (or no file) yields the reference timings.

use mb_types::AnalysisId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything a single run needs, built once and handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Analysis that scopes every broker call.
    pub analysis_id: AnalysisId,
    /// Number of distinct messages to send.
    pub message_count: usize,
    /// Timing and endpoint tuning.
    pub tuning: Tuning,
}

impl RunConfig {
    /// Create a run config with default tuning.
    pub fn new(analysis_id: AnalysisId, message_count: usize) -> Self {
        Self {
            analysis_id,
            message_count,
            tuning: Tuning::default(),
        }
    }

    /// Replace the tuning.
    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }
}

/// Root of the tuning file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tuning {
    /// Random bytes per message id, hex encoded (default: 50).
    #[serde(default = "default_message_length")]
    pub message_length: usize,
    /// Receive side timing.
    #[serde(default)]
    pub receive: ReceiveConfig,
    /// Result collector settings.
    #[serde(default)]
    pub collector: CollectorConfig,
    /// Readiness phase settings.
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// Broker and auth HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Receive side timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiveConfig {
    /// Inactivity window that ends draining (default: 15000).
    #[serde(default = "default_quiescence_window_ms")]
    pub quiescence_window_ms: u64,
    /// Upper bound on joining the receive task once senders finished
    /// (default: 30000). Must be at least the quiescence window.
    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
    /// Upper bound on waiting for the delivery record (default: 15000).
    #[serde(default = "default_result_timeout_ms")]
    pub result_timeout_ms: u64,
}

/// Result collector settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// Local listen address (default: 0.0.0.0:8080).
    #[serde(default = "default_collector_bind")]
    pub bind_address: String,
    /// URL the brokers should POST to. Derived from the bound address when
    /// absent or empty (default: http://host.docker.internal:8080/results).
    #[serde(default = "default_webhook_url")]
    pub webhook_url: Option<String>,
    /// How long a webhook handler may wait on a full channel (default: 5000).
    #[serde(default = "default_handoff_timeout_ms")]
    pub handoff_timeout_ms: u64,
}

/// Readiness phase settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadinessConfig {
    /// Overall wait in seconds; 0 skips the phase (default: 0).
    #[serde(default)]
    pub timeout_secs: u64,
    /// Delay between polls of a node that is not ready (default: 500).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Broker and auth HTTP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Timeout per broker request (default: 300).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout per token request (default: 10).
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
    /// Keycloak realm (default: privateaim).
    #[serde(default = "default_auth_realm")]
    pub auth_realm: String,
}

fn default_message_length() -> usize {
    50
}

fn default_quiescence_window_ms() -> u64 {
    15_000
}

fn default_join_timeout_ms() -> u64 {
    30_000
}

fn default_result_timeout_ms() -> u64 {
    15_000
}

fn default_collector_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_webhook_url() -> Option<String> {
    Some("http://host.docker.internal:8080/results".to_string())
}

fn default_handoff_timeout_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_auth_timeout_secs() -> u64 {
    10
}

fn default_auth_realm() -> String {
    "privateaim".to_string()
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            message_length: default_message_length(),
            receive: ReceiveConfig::default(),
            collector: CollectorConfig::default(),
            readiness: ReadinessConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            quiescence_window_ms: default_quiescence_window_ms(),
            join_timeout_ms: default_join_timeout_ms(),
            result_timeout_ms: default_result_timeout_ms(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_address: default_collector_bind(),
            webhook_url: default_webhook_url(),
            handoff_timeout_ms: default_handoff_timeout_ms(),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            auth_timeout_secs: default_auth_timeout_secs(),
            auth_realm: default_auth_realm(),
        }
    }
}

impl ReceiveConfig {
    /// The quiescence window as a duration.
    pub fn quiescence_window(&self) -> Duration {
        Duration::from_millis(self.quiescence_window_ms)
    }

    /// The receiver join bound as a duration.
    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    /// The record wait bound as a duration.
    pub fn result_timeout(&self) -> Duration {
        Duration::from_millis(self.result_timeout_ms)
    }
}

impl CollectorConfig {
    /// The configured webhook URL, or `None` when it should be derived.
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|url| !url.trim().is_empty())
    }

    /// The handoff timeout as a duration.
    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_millis(self.handoff_timeout_ms)
    }
}

impl ReadinessConfig {
    /// Overall wait, or `None` when the phase is disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// The poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Tuning {
    /// Load tuning from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check values that parse fine but make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_length == 0 {
            return Err(ConfigError::InvalidMessageLength);
        }
        if self.receive.join_timeout_ms < self.receive.quiescence_window_ms {
            return Err(ConfigError::InvalidTimeouts {
                join_timeout_ms: self.receive.join_timeout_ms,
                quiescence_window_ms: self.receive.quiescence_window_ms,
            });
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the tuning file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the tuning file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },

    /// A run must send at least one message.
    #[error("number of messages to send must be at least 1")]
    NoMessages,

    /// Too few broker nodes for the delivery mode.
    #[error("{mode} test requires at least {required} nodes, got {given}")]
    InsufficientNodes {
        /// Mode being run.
        mode: &'static str,
        /// Nodes the mode needs.
        required: usize,
        /// Nodes supplied.
        given: usize,
    },

    /// Message ids need at least one random byte.
    #[error("message_length must be at least 1")]
    InvalidMessageLength,

    /// The receiver join bound is shorter than the quiescence window.
    #[error("join_timeout_ms ({join_timeout_ms}) must not be smaller than quiescence_window_ms ({quiescence_window_ms})")]
    InvalidTimeouts {
        /// Configured join bound.
        join_timeout_ms: u64,
        /// Configured quiescence window.
        quiescence_window_ms: u64,
    },
}
