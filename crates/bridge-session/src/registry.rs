//! Category → data handler registry.
//!
//! One handler per category, last writer wins. Lookups clone the handler's
//! `Arc` under a read lock and return it, so handlers always run with the
//! lock released and may re-register from inside a callback.

use std::sync::Arc;

use ahash::AHashMap;
use bridge_core::Category;
use parking_lot::RwLock;

/// Callback invoked for each inbound message of a category.
///
/// Parameters: `(payload, topic_suffix)`
pub type DataHandler = Arc<dyn Fn(&[u8], &str) + Send + Sync>;

#[derive(Default)]
pub struct CallbackRegistry {
    handlers: RwLock<AHashMap<Category, DataHandler>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or clear (`None`) the handler for a category.
    ///
    /// Returns the handler that was replaced, if any.
    pub fn register(&self, category: Category, handler: Option<DataHandler>) -> Option<DataHandler> {
        let mut handlers = self.handlers.write();
        match handler {
            Some(h) => handlers.insert(category, h),
            None => handlers.remove(&category),
        }
    }

    pub fn get(&self, category: Category) -> Option<DataHandler> {
        self.handlers.read().get(&category).cloned()
    }

    pub fn contains(&self, category: Category) -> bool {
        self.handlers.read().contains_key(&category)
    }

    /// Categories with a handler, in declaration order.
    pub fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.handlers.read().keys().copied().collect();
        categories.sort_unstable();
        categories
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackRegistry").field("categories", &self.categories()).finish()
    }
}
