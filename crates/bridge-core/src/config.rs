//! Session configuration.
//!
//! Read from a JSON file. Every field has a production default, so an empty
//! object is a valid config.
//!
//! # Example config
//!
//! ```json
//! {
//!   "environment": "prod",
//!   "identity_url": "https://idaas.iiflsecurities.com/v1/access/check/token",
//!   "identity_timeout_secs": 10,
//!   "keep_alive_secs": 20,
//!   "max_topics_per_request": 1024,
//!   "log": { "level": "info", "dir": "/tmp/log", "module_name": "bridge" }
//! }
//! ```

use serde::Deserialize;
use tracing::debug;

use crate::error::BridgeError;
use crate::status::MAX_TOPICS_PER_REQUEST;
use crate::types::QoS;

/// Configuration for one session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// First path segment of every namespace prefix.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Token validation endpoint of the identity service.
    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    /// Overall deadline for one token validation round trip.
    #[serde(default = "default_identity_timeout_secs")]
    pub identity_timeout_secs: u64,

    /// Keep-alive interval handed to the transport on connect.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u16,

    /// Whether the transport should discard broker-side session state.
    #[serde(default = "default_clean_session")]
    pub clean_session: bool,

    /// Upper bound on suffixes per subscribe/unsubscribe request.
    #[serde(default = "default_max_topics")]
    pub max_topics_per_request: usize,

    /// QoS requested for every subscribed topic.
    #[serde(default)]
    pub subscribe_qos: QoS,

    /// Logging options, consumed by [`crate::logging::init_logging`].
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            identity_url: default_identity_url(),
            identity_timeout_secs: default_identity_timeout_secs(),
            keep_alive_secs: default_keep_alive_secs(),
            clean_session: default_clean_session(),
            max_topics_per_request: default_max_topics(),
            subscribe_qos: QoS::default(),
            log: LogConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Reject values the session cannot honour.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.environment.trim_matches('/').is_empty() {
            return Err(BridgeError::Config("environment must not be empty".into()));
        }
        if self.identity_timeout_secs == 0 {
            return Err(BridgeError::Config("identity_timeout_secs must be positive".into()));
        }
        if self.max_topics_per_request == 0 || self.max_topics_per_request > MAX_TOPICS_PER_REQUEST {
            return Err(BridgeError::Config(format!(
                "max_topics_per_request must be in 1..={MAX_TOPICS_PER_REQUEST}, got {}",
                self.max_topics_per_request
            )));
        }
        Ok(())
    }
}

/// Logging options.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Directory for daily-rotating log files; console only when absent.
    pub dir: Option<String>,
    /// Log file prefix.
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: default_log_level(), dir: None, module_name: default_module_name() }
    }
}

// ---------------------------------------------------------------------------
// Defaults (used by serde)
// ---------------------------------------------------------------------------

fn default_environment() -> String {
    "prod".into()
}

fn default_identity_url() -> String {
    "https://idaas.iiflsecurities.com/v1/access/check/token".into()
}

fn default_identity_timeout_secs() -> u64 {
    10
}

fn default_keep_alive_secs() -> u16 {
    20
}

fn default_clean_session() -> bool {
    true
}

fn default_max_topics() -> usize {
    MAX_TOPICS_PER_REQUEST
}

fn default_log_level() -> String {
    "info".into()
}

fn default_module_name() -> String {
    "bridge".into()
}

/// Load, parse, and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<SessionConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: SessionConfig = serde_json::from_str(&content)?;
    config.validate()?;
    debug!("config loaded from {} (environment={})", path.display(), config.environment);
    Ok(config)
}
