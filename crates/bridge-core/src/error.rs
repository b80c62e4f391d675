//! Typed error definitions for the bridge feed session layer.
//!
//! [`BridgeError`] names the internal failure kinds that the session converts
//! into response values. Nothing in the public session API returns it
//! directly; it exists so that each internal step yields an explicit kind
//! instead of an opaque string, and so every kind maps onto one wire status.

use thiserror::Error;

use crate::status;

/// Domain-specific errors for the bridge feed session layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Request body was empty or `null`.
    #[error("{}", status::message::NULL_REQUEST)]
    NullRequest,

    /// Request body could not be parsed.
    #[error("Invalid JSON: {0}")]
    InvalidRequest(String),

    /// A required request field was absent or null.
    #[error("The parameter '{0}' should not be empty")]
    MissingField(String),

    /// Token could not be decoded, or the identity service rejected it.
    #[error("{0}")]
    Identity(String),

    /// The transport adapter raised instead of returning a status.
    #[error("{0}")]
    Transport(String),

    /// A response or ack event could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Wire status code reported for this error kind.
    pub fn status(&self) -> i32 {
        match self {
            Self::NullRequest => status::NULL_REQUEST,
            Self::Identity(_) => status::IDENTITY_REJECTED,
            _ => status::INTERNAL_ERROR,
        }
    }

    /// Wrap an `anyhow` error coming back from a collaborator seam.
    pub fn transport(err: &anyhow::Error) -> Self {
        Self::Transport(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            if let Some(field) = missing_field_name(&err.to_string()) {
                return Self::MissingField(field);
            }
        }
        Self::InvalidRequest(err.to_string())
    }
}

/// Pull the field name out of serde's "missing field `x`" message.
fn missing_field_name(msg: &str) -> Option<String> {
    let rest = msg.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}
