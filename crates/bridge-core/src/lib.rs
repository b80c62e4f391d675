//! # bridge-core
//!
//! Core crate for the bridge feed session layer, providing:
//!
//! - **Types** (`types`): categories, namespace table, wire request/response/ack shapes
//! - **Topic validation** (`topic`): suffix grammar check
//! - **Status codes** (`status`): numeric codes and fixed messages
//! - **Configuration** (`config`): JSON config deserialization
//! - **Error types** (`error`): domain-specific `BridgeError` via thiserror
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod status;
pub mod topic;
pub mod types;

// Re-export types at crate root for convenience.
pub use error::BridgeError;
pub use types::*;
