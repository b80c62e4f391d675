//! Transport adapter contract.
//!
//! The session never speaks a wire protocol itself. It drives a [`Transport`]
//! (connect, subscribe, unsubscribe, disconnect, delivery loop) and receives
//! everything asynchronous through a [`TransportListener`] installed before
//! connect.
//!
//! # Threading
//!
//! Listener methods are invoked from the transport's delivery thread while
//! application threads call into the session concurrently. Every `Transport`
//! method must be a non-blocking handshake: it may hand work to the delivery
//! thread but must never wait on it.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bridge_core::{ConnectionState, QoS};

/// Transport-assigned token pairing a request with its later ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u32);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Synchronous status returned by a transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportReply {
    /// Zero when the transport accepted the call.
    pub code: i32,
    /// Human-readable status text.
    pub text: String,
}

impl TransportReply {
    pub fn new(code: i32, text: impl Into<String>) -> Self {
        Self { code, text: text.into() }
    }

    pub fn success() -> Self {
        Self::new(0, "No error.")
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// Reply to a subscribe/unsubscribe call: status plus the id its ack will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub reply: TransportReply,
    pub id: CorrelationId,
}

/// Parameters for the transport-level connect.
#[derive(Clone)]
pub struct ConnectOptions {
    pub host: String,
    pub port: u16,
    /// Client identity presented to the broker.
    pub principal: String,
    pub secret: String,
    pub keep_alive: Duration,
    pub clean_session: bool,
}

impl std::fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("principal", &self.principal)
            .field("secret", &"<redacted>")
            .field("keep_alive", &self.keep_alive)
            .field("clean_session", &self.clean_session)
            .finish()
    }
}

/// Receiver for everything the transport delivers asynchronously.
pub trait TransportListener: Send + Sync {
    /// Inbound publish on `topic`.
    fn on_message(&self, topic: &str, payload: &[u8]);

    /// Broker answered the connect.
    fn on_connect_ack(&self, code: i32, reason: &str);

    /// Connection closed, requested or not.
    fn on_disconnect_ack(&self, code: i32, reason: &str);

    /// Subscribe completed; one reason code per requested topic, in order.
    fn on_subscribe_ack(&self, id: CorrelationId, reason_codes: &[u8]);

    /// Unsubscribe completed; one reason code per requested topic, in order.
    fn on_unsubscribe_ack(&self, id: CorrelationId, reason_codes: &[u8]);
}

/// A bidirectional pub/sub transport.
///
/// `Err` means the call raised; a non-zero [`TransportReply::code`] means the
/// transport refused it. The session reports the two differently.
pub trait Transport: Send + Sync {
    /// Install the listener that receives every asynchronous callback.
    fn set_listener(&self, listener: Arc<dyn TransportListener>);

    fn connect(&self, options: &ConnectOptions) -> Result<TransportReply>;

    /// Start delivering callbacks on the transport's own thread.
    fn start_loop(&self) -> Result<()>;

    /// Stop delivering callbacks. No listener method may run after this returns.
    fn stop_loop(&self) -> Result<()>;

    fn subscribe(&self, topics: &[(String, QoS)]) -> Result<Submitted>;

    fn unsubscribe(&self, topics: &[String]) -> Result<Submitted>;

    fn disconnect(&self) -> Result<TransportReply>;

    fn is_connected(&self) -> bool;

    /// Connection state as seen by the transport.
    fn state(&self) -> ConnectionState {
        if self.is_connected() { ConnectionState::Connected } else { ConnectionState::Disconnected }
    }
}
