//! Request, response, and acknowledgment shapes exchanged with callers.
//!
//! Field names are camelCase on the wire and stable across every category.

use serde::{Deserialize, Deserializer, Serialize};

use super::enums::PacketType;
use crate::error::BridgeError;
use crate::status;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Connect request: endpoint plus bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub host: String,
    pub port: u16,
    pub token: String,
}

/// Subscribe request body.
///
/// The outer `Option` distinguishes a missing key from an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(rename = "subscriptionList", default, deserialize_with = "present")]
    pub subscription_list: Option<Option<Vec<String>>>,
}

/// Unsubscribe request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnsubscribeRequest {
    #[serde(rename = "unsubscriptionList", default, deserialize_with = "present")]
    pub unsubscription_list: Option<Option<Vec<String>>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// `{status, message}`: returned by connect and disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: i32,
    pub message: String,
}

pub type ConnectResponse = StatusResponse;
pub type DisconnectResponse = StatusResponse;

impl StatusResponse {
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == status::ACCEPTED
    }

    pub fn to_json(&self) -> String {
        encode(self)
    }
}

impl From<&BridgeError> for StatusResponse {
    fn from(err: &BridgeError) -> Self {
        Self::new(err.status(), err.to_string())
    }
}

/// Outcome for a single topic: validation failure or ack result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicResult {
    pub topic: String,
    pub result_code: i32,
    pub result: String,
}

impl TopicResult {
    pub fn invalid(suffix: impl Into<String>) -> Self {
        Self {
            topic: suffix.into(),
            result_code: status::INVALID_TOPIC,
            result: status::message::INVALID_TOPIC.to_string(),
        }
    }

    /// Ack outcome for a topic; code zero is granted.
    pub fn from_reason(suffix: impl Into<String>, reason_code: u8) -> Self {
        let result = if reason_code == 0 { status::message::GRANTED } else { status::message::NOT_GRANTED };
        Self { topic: suffix.into(), result_code: i32::from(reason_code), result: result.to_string() }
    }

    /// Unsubscribe ack outcome for a topic; code zero is released.
    pub fn from_release(suffix: impl Into<String>, reason_code: u8) -> Self {
        let result = if reason_code == 0 { status::message::RELEASED } else { status::message::NOT_RELEASED };
        Self { topic: suffix.into(), result_code: i32::from(reason_code), result: result.to_string() }
    }

    pub fn is_granted(&self) -> bool {
        self.result_code == status::ACCEPTED
    }
}

/// `{status, message, failedTopics}`: returned by subscribe and unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub status: i32,
    pub message: String,
    pub failed_topics: Vec<TopicResult>,
}

pub type SubscribeResponse = SubscriptionResponse;
pub type UnsubscribeResponse = SubscriptionResponse;

impl SubscriptionResponse {
    pub fn new(status: i32, message: impl Into<String>, failed_topics: Vec<TopicResult>) -> Self {
        Self { status, message: message.into(), failed_topics }
    }

    /// Whole-request failure with no per-topic detail.
    pub fn rejected(status: i32, message: impl Into<String>) -> Self {
        Self::new(status, message, Vec::new())
    }

    pub fn is_accepted(&self) -> bool {
        self.status == status::ACCEPTED
    }

    pub fn to_json(&self) -> String {
        encode(self)
    }
}

impl From<&BridgeError> for SubscriptionResponse {
    fn from(err: &BridgeError) -> Self {
        Self::rejected(err.status(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Acknowledgment events
// ---------------------------------------------------------------------------

/// `{packetType, packetName, status, message}`: connect/disconnect acks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusAck {
    pub packet_type: u8,
    pub packet_name: &'static str,
    pub status: i32,
    pub message: String,
}

/// `{packetType, packetName, subscriptionResult}`: subscribe ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeAck {
    pub packet_type: u8,
    pub packet_name: &'static str,
    pub subscription_result: Vec<TopicResult>,
}

/// `{packetType, packetName, status, message, unsubscriptionResult}`: unsubscribe ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeAck {
    pub packet_type: u8,
    pub packet_name: &'static str,
    pub status: i32,
    pub message: String,
    pub unsubscription_result: Vec<TopicResult>,
}

/// Asynchronous acknowledgment pushed to the registered ack handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AckEvent {
    Connect(StatusAck),
    Subscribe(SubscribeAck),
    Unsubscribe(UnsubscribeAck),
    Disconnect(StatusAck),
}

impl AckEvent {
    pub fn connect(status: i32, message: impl Into<String>) -> Self {
        Self::Connect(status_ack(PacketType::ConnAck, status, message.into()))
    }

    pub fn disconnect(status: i32, message: impl Into<String>) -> Self {
        Self::Disconnect(status_ack(PacketType::Disconnect, status, message.into()))
    }

    pub fn subscribe(results: Vec<TopicResult>) -> Self {
        Self::Subscribe(SubscribeAck {
            packet_type: PacketType::SubAck.code(),
            packet_name: PacketType::SubAck.name(),
            subscription_result: results,
        })
    }

    /// Status is zero only when every topic was released. Otherwise it is the
    /// first non-zero reason code the broker returned.
    pub fn unsubscribe(results: Vec<TopicResult>) -> Self {
        let rejected = results.iter().filter(|r| !r.is_granted()).count();
        let (status, message) = match results.iter().find(|r| !r.is_granted()) {
            None => (status::ACCEPTED, status::message::UNSUBSCRIBED.to_string()),
            Some(first) => (first.result_code, format!("{rejected} topic(s) not unsubscribed")),
        };
        Self::Unsubscribe(UnsubscribeAck {
            packet_type: PacketType::UnsubAck.code(),
            packet_name: PacketType::UnsubAck.name(),
            status,
            message,
            unsubscription_result: results,
        })
    }

    pub fn packet_type(&self) -> PacketType {
        match self {
            Self::Connect(_) => PacketType::ConnAck,
            Self::Subscribe(_) => PacketType::SubAck,
            Self::Unsubscribe(_) => PacketType::UnsubAck,
            Self::Disconnect(_) => PacketType::Disconnect,
        }
    }

    pub fn to_json(&self) -> String {
        encode(self)
    }
}

fn status_ack(packet: PacketType, status: i32, message: String) -> StatusAck {
    StatusAck { packet_type: packet.code(), packet_name: packet.name(), status, message }
}

/// Body returned when a wire value fails to serialize.
const ENCODE_FAILURE: &str = r#"{"status":-1,"message":"encode error"}"#;

/// Serialize a wire value; falls back to a fixed internal-error body.
fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::error!("{}", BridgeError::Encode(e.to_string()));
        ENCODE_FAILURE.to_string()
    })
}
