//! # bridge-session
//!
//! Session layer between application code and a pub/sub transport carrying
//! market data and order/trade updates:
//!
//! - **Session** (`session`): connect, subscribe, unsubscribe, disconnect
//! - **Dispatch** (`dispatcher`, `registry`): topic → category → handler
//! - **Correlation** (`pending`): in-flight requests matched to their acks
//! - **Identity** (`identity`): token decoding and validation
//! - **Transport seam** (`transport`): the adapter contract
//! - **JSON façade** (`json`): string-in/string-out wrapper

pub mod dispatcher;
pub mod identity;
pub mod json;
pub mod pending;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use dispatcher::{Dispatch, Dispatcher};
pub use identity::{HttpIdentityValidator, IdentityValidator, IdentityVerdict};
pub use json::{JsonAckHandler, JsonBridge};
pub use registry::{CallbackRegistry, DataHandler};
pub use session::{AckHandler, ErrorHandler, SessionManager};
pub use transport::{ConnectOptions, CorrelationId, Submitted, Transport, TransportListener, TransportReply};
