//! Domain types for the bridge feed session layer.

pub mod enums;
pub mod namespace;
pub mod wire;

pub use enums::*;
pub use namespace::{NamespaceTable, VERSION_MARKER, split_topic, topic_suffix};
pub use wire::*;
