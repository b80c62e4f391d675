//! Inbound message routing.
//!
//! Resolves a topic to its category through the namespace table, then hands
//! `(payload, suffix)` to the category's handler. Messages for categories
//! without a handler are dropped; that is routine, not an error. A handler
//! that panics is contained here so the delivery thread keeps running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bridge_core::{Category, NamespaceTable};
use tracing::trace;

use crate::registry::{CallbackRegistry, DataHandler};

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Delivered(Category),
    /// The handler panicked; the panic message is kept.
    HandlerPanicked { category: Category, reason: String },
    /// Known category, no handler registered.
    NoHandler(Category),
    /// Topic prefix is not one of ours.
    Unrouted,
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    namespaces: Arc<NamespaceTable>,
    registry: CallbackRegistry,
}

impl Dispatcher {
    pub fn new(namespaces: Arc<NamespaceTable>) -> Self {
        Self { namespaces, registry: CallbackRegistry::new() }
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn register(&self, category: Category, handler: Option<DataHandler>) -> Option<DataHandler> {
        self.registry.register(category, handler)
    }

    /// Route one message. Runs on the transport's delivery thread.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> Dispatch {
        let Some((category, suffix)) = self.namespaces.resolve(topic) else {
            trace!("unrouted message on {topic}");
            return Dispatch::Unrouted;
        };
        match self.registry.get(category) {
            Some(handler) => match panic::catch_unwind(AssertUnwindSafe(|| handler(payload, suffix))) {
                Ok(()) => Dispatch::Delivered(category),
                Err(cause) => Dispatch::HandlerPanicked { category, reason: panic_message(cause.as_ref()) },
            },
            None => {
                trace!("[{category}] no handler, dropping {suffix}");
                Dispatch::NoHandler(category)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    type Seen = Arc<Mutex<Vec<(Vec<u8>, String)>>>;

    fn recorder(seen: &Seen) -> DataHandler {
        let seen = Arc::clone(seen);
        Arc::new(move |payload, suffix| seen.lock().push((payload.to_vec(), suffix.to_string())))
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(NamespaceTable::new("prod")))
    }

    #[test]
    fn delivers_only_to_matching_prefix() {
        let d = dispatcher();
        let feed: Seen = Default::default();
        let index: Seen = Default::default();
        d.register(Category::Feed, Some(recorder(&feed)));
        d.register(Category::Index, Some(recorder(&index)));

        assert_eq!(d.dispatch("prod/marketfeed/mw/v1/123", b"tick"), Dispatch::Delivered(Category::Feed));
        assert_eq!(*feed.lock(), vec![(b"tick".to_vec(), "123".to_string())]);
        assert!(index.lock().is_empty());
    }

    #[test]
    fn drops_without_handler() {
        let d = dispatcher();
        assert_eq!(d.dispatch("prod/marketfeed/oi/v1/123", b""), Dispatch::NoHandler(Category::OpenInterest));
        assert_eq!(d.dispatch("prod/other/v1/123", b""), Dispatch::Unrouted);
        assert_eq!(d.dispatch("garbage", b""), Dispatch::Unrouted);
    }

    #[test]
    fn low_52_week_has_its_own_route() {
        let d = dispatcher();
        let high: Seen = Default::default();
        let low: Seen = Default::default();
        d.register(Category::High52Week, Some(recorder(&high)));
        d.register(Category::Low52Week, Some(recorder(&low)));

        d.dispatch("prod/marketfeed/low52week/v1/nsefo", b"l");
        d.dispatch("prod/marketfeed/high52week/v1/bsefo", b"h");
        assert_eq!(*low.lock(), vec![(b"l".to_vec(), "nsefo".to_string())]);
        assert_eq!(*high.lock(), vec![(b"h".to_vec(), "bsefo".to_string())]);
    }

    #[test]
    fn panicking_handler_is_contained() {
        let d = dispatcher();
        d.register(Category::Feed, Some(Arc::new(|_: &[u8], _: &str| panic!("bad payload"))));
        assert_eq!(
            d.dispatch("prod/marketfeed/mw/v1/1", b"x"),
            Dispatch::HandlerPanicked { category: Category::Feed, reason: "bad payload".into() }
        );

        let seen: Seen = Default::default();
        d.register(Category::Feed, Some(recorder(&seen)));
        assert_eq!(d.dispatch("prod/marketfeed/mw/v1/2", b"y"), Dispatch::Delivered(Category::Feed));
        assert_eq!(seen.lock().len(), 1);
    }

    fn caught(f: impl FnOnce() + panic::UnwindSafe) -> Box<dyn Any + Send> {
        panic::catch_unwind(f).unwrap_err()
    }

    #[test]
    fn panic_message_formats() {
        assert_eq!(panic_message(caught(|| panic!("code {}", 7)).as_ref()), "code 7");
        assert_eq!(panic_message(caught(|| panic::panic_any(42u8)).as_ref()), "non-string panic payload");
    }

    #[test]
    fn preserves_delivery_order() {
        let d = dispatcher();
        let seen: Seen = Default::default();
        d.register(Category::OrderUpdates, Some(recorder(&seen)));
        for i in 0..50u8 {
            d.dispatch("prod/updates/order/v1/s0007", &[i]);
        }
        let order: Vec<u8> = seen.lock().iter().map(|(p, _)| p[0]).collect();
        assert_eq!(order, (0..50).collect::<Vec<u8>>());
    }
}
