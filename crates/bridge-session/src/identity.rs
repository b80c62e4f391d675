//! Identity collaborator: token decoding and token validation.
//!
//! The bearer token is a JWT whose `preferred_username` claim is the client
//! id. Before connecting, the id and token are checked against the identity
//! service with a single POST. The transport then authenticates with the
//! client id as principal and a secret derived from the token.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use bridge_core::BridgeError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Status string the identity service returns for an accepted token.
const ACCEPTED_STATUS: &str = "Success";

/// Extract the client id from a JWT bearer token.
pub fn decode_client_id(token: &str) -> Result<String, BridgeError> {
    #[derive(Deserialize)]
    struct Claims {
        preferred_username: String,
    }

    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| BridgeError::Identity("token is not a JWT".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| BridgeError::Identity(format!("token payload is not base64url: {e}")))?;
    let claims: Claims = serde_json::from_slice(&bytes)
        .map_err(|e| BridgeError::Identity(format!("token payload has no client id: {e}")))?;
    if claims.preferred_username.is_empty() {
        return Err(BridgeError::Identity("token carries an empty client id".into()));
    }
    Ok(claims.preferred_username)
}

/// Principal/secret pair presented to the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub principal: String,
    pub secret: String,
}

impl Credentials {
    pub fn from_token(client_id: &str, token: &str) -> Self {
        Self { principal: client_id.to_string(), secret: format!("OPENID~~{token}~") }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("principal", &self.principal).finish_non_exhaustive()
    }
}

/// Outcome of a token check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityVerdict {
    Accepted,
    Rejected(String),
}

/// Validates a client id/token pair with the identity service.
///
/// `Err` means the check itself failed (network, malformed reply); a token the
/// service refuses is `Ok(Rejected)`.
#[async_trait]
pub trait IdentityValidator: Send + Sync {
    async fn validate(&self, client_id: &str, token: &str) -> Result<IdentityVerdict>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateTokenRequest<'a> {
    user_id: &'a str,
    token: &'a str,
}

#[derive(Deserialize)]
struct ValidateTokenResponse {
    result: ValidateTokenResult,
}

#[derive(Deserialize)]
struct ValidateTokenResult {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// [`IdentityValidator`] backed by the identity service's HTTP endpoint.
pub struct HttpIdentityValidator {
    http: reqwest::Client,
    url: String,
}

impl HttpIdentityValidator {
    /// Every request, body read included, must finish within `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build().context("building identity HTTP client")?;
        Ok(Self { http, url: url.into() })
    }
}

#[async_trait]
impl IdentityValidator for HttpIdentityValidator {
    async fn validate(&self, client_id: &str, token: &str) -> Result<IdentityVerdict> {
        let resp = self
            .http
            .post(&self.url)
            .json(&ValidateTokenRequest { user_id: client_id, token })
            .send()
            .await
            .context("token validation request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("token validation body unreadable")?;
        debug!("token validation for {client_id}: HTTP {status}");

        if !status.is_success() {
            let reason = if body.is_empty() { status.to_string() } else { body };
            return Ok(IdentityVerdict::Rejected(reason));
        }

        let parsed: ValidateTokenResponse =
            serde_json::from_str(&body).context("token validation reply is not the expected JSON")?;
        if parsed.result.status == ACCEPTED_STATUS {
            Ok(IdentityVerdict::Accepted)
        } else {
            Ok(IdentityVerdict::Rejected(parsed.result.message.unwrap_or(parsed.result.status)))
        }
    }
}

#[cfg(test)]
pub(crate) fn make_token(client_id: &str) -> String {
    let claims = serde_json::json!({ "preferred_username": client_id, "exp": 4102444800u64 });
    format!("eyJhbGciOiJSUzI1NiJ9.{}.c2ln", URL_SAFE_NO_PAD.encode(claims.to_string()))
}
