//! Status codes and fixed messages shared by every response shape.
//!
//! Zero means accepted. The 10x block is request-shape failures detected
//! locally; negative values are internal or transport exceptions. Any other
//! positive value is passed through verbatim from the transport adapter.

/// Request accepted (or transport reported success).
pub const ACCEPTED: i32 = 0;
/// Identity service rejected the token, or the token did not decode.
pub const IDENTITY_REJECTED: i32 = 1;
/// Request body was null or empty.
pub const NULL_REQUEST: i32 = 101;
/// Topic list was empty, null, or longer than the per-request ceiling.
pub const TOPIC_COUNT_OUT_OF_BOUNDS: i32 = 102;
/// No topic survived validation, nothing was submitted.
pub const NOTHING_TO_SUBMIT: i32 = 103;
/// Per-topic result code for a suffix that failed validation.
pub const INVALID_TOPIC: i32 = 104;
/// `connect` called while the transport already reports connected.
pub const ALREADY_CONNECTED: i32 = 105;
/// Internal failure or an exception raised by a collaborator.
pub const INTERNAL_ERROR: i32 = -1;

/// Hard ceiling on suffixes per subscribe/unsubscribe request.
pub const MAX_TOPICS_PER_REQUEST: usize = 1024;

pub mod message {
    pub const NULL_REQUEST: &str = "Request cannot be null";
    pub const TOPIC_COUNT_OUT_OF_BOUNDS: &str =
        "TopicList cannot be null and no. of topics should be less than 1024";
    pub const INVALID_TOPIC: &str = "Invalid topic";
    pub const ALREADY_CONNECTED: &str = "Client is already connected";
    pub const SUBSCRIBE_PARTIAL: &str = "Subscription partially sent";
    pub const SUBSCRIBE_FAILED: &str = "Subscription failed";
    pub const UNSUBSCRIBE_PARTIAL: &str = "Unsubscription partially sent";
    pub const UNSUBSCRIBE_FAILED: &str = "Unsubscription failed";
    pub const UNSUBSCRIBED: &str = "Unsubscribed Successfully";
    pub const GRANTED: &str = "Granted";
    pub const NOT_GRANTED: &str = "Not Granted";
    pub const RELEASED: &str = "Unsubscribed";
    pub const NOT_RELEASED: &str = "Not Unsubscribed";
}
