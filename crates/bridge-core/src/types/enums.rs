//! Enumerations used throughout the bridge feed session layer.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Data categories
// ---------------------------------------------------------------------------

/// Logical data category. Each one owns exactly one namespace prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Market watch price feed.
    Feed,
    Index,
    OpenInterest,
    MarketStatus,
    /// Last permissible price band.
    Lpp,
    High52Week,
    Low52Week,
    UpperCircuit,
    LowerCircuit,
    OrderUpdates,
    TradeUpdates,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 11] = [
        Self::Feed,
        Self::Index,
        Self::OpenInterest,
        Self::MarketStatus,
        Self::Lpp,
        Self::High52Week,
        Self::Low52Week,
        Self::UpperCircuit,
        Self::LowerCircuit,
        Self::OrderUpdates,
        Self::TradeUpdates,
    ];

    /// Path between the environment segment and the version marker.
    pub fn path(self) -> &'static str {
        match self {
            Self::Feed => "marketfeed/mw",
            Self::Index => "marketfeed/index",
            Self::OpenInterest => "marketfeed/oi",
            Self::MarketStatus => "marketfeed/marketstatus",
            Self::Lpp => "marketfeed/lpp",
            Self::High52Week => "marketfeed/high52week",
            Self::Low52Week => "marketfeed/low52week",
            Self::UpperCircuit => "marketfeed/uppercircuit",
            Self::LowerCircuit => "marketfeed/lowercircuit",
            Self::OrderUpdates => "updates/order",
            Self::TradeUpdates => "updates/trade",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Index => "index",
            Self::OpenInterest => "open_interest",
            Self::MarketStatus => "market_status",
            Self::Lpp => "lpp",
            Self::High52Week => "high_52_week",
            Self::Low52Week => "low_52_week",
            Self::UpperCircuit => "upper_circuit",
            Self::LowerCircuit => "lower_circuit",
            Self::OrderUpdates => "order_updates",
            Self::TradeUpdates => "trade_updates",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Acknowledgment kinds
// ---------------------------------------------------------------------------

/// Which asynchronous ack a pending request is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    Subscribe,
    Unsubscribe,
}

impl AckKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }
}

impl std::fmt::Display for AckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Packet types
// ---------------------------------------------------------------------------

/// Control packet carried in acknowledgment events.
///
/// Discriminants are the control packet type numbers, preserved for
/// wire compatibility with the `packetType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    ConnAck = 2,
    SubAck = 9,
    UnsubAck = 11,
    Disconnect = 14,
}

impl PacketType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Name carried in the `packetName` field.
    pub fn name(self) -> &'static str {
        match self {
            Self::ConnAck => "CONNACK",
            Self::SubAck => "SUBACK",
            Self::UnsubAck => "UNSUBACK",
            Self::Disconnect => "DISCONNECT",
        }
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

/// Connection state as reported by the transport. Never stored by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

// ---------------------------------------------------------------------------
// Delivery QoS
// ---------------------------------------------------------------------------

/// Requested delivery guarantee for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(format!("invalid qos level {other}")),
        }
    }
}

impl From<QoS> for u8 {
    fn from(qos: QoS) -> Self {
        qos as u8
    }
}
