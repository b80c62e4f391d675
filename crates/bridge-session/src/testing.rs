//! In-process transport and identity doubles for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bridge_core::QoS;
use parking_lot::Mutex;

use crate::identity::{IdentityValidator, IdentityVerdict};
use crate::transport::{ConnectOptions, CorrelationId, Submitted, Transport, TransportListener, TransportReply};

const NOT_CONNECTED: (i32, &str) = (4, "The client is not currently connected.");

/// Records every call and lets the test drive the delivery side by hand.
pub struct MockTransport {
    listener: Mutex<Option<Arc<dyn TransportListener>>>,
    connected: AtomicBool,
    connect_calls: AtomicUsize,
    loop_starts: AtomicUsize,
    loop_stops: AtomicUsize,
    last_connect: Mutex<Option<ConnectOptions>>,
    connect_reply: Mutex<TransportReply>,
    submit_reply: Mutex<TransportReply>,
    raise: Mutex<Option<String>>,
    inline_ack: Mutex<Option<Vec<u8>>>,
    next_id: AtomicU32,
    subscribes: Mutex<Vec<(CorrelationId, Vec<(String, QoS)>)>>,
    unsubscribes: Mutex<Vec<(CorrelationId, Vec<String>)>>,
    acked_cursor: Mutex<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            listener: Mutex::new(None),
            connected: AtomicBool::new(false),
            connect_calls: AtomicUsize::new(0),
            loop_starts: AtomicUsize::new(0),
            loop_stops: AtomicUsize::new(0),
            last_connect: Mutex::new(None),
            connect_reply: Mutex::new(TransportReply::success()),
            submit_reply: Mutex::new(TransportReply::success()),
            raise: Mutex::new(None),
            inline_ack: Mutex::new(None),
            next_id: AtomicU32::new(1),
            subscribes: Mutex::new(Vec::new()),
            unsubscribes: Mutex::new(Vec::new()),
            acked_cursor: Mutex::new(0),
        }
    }

    // -- configuration ------------------------------------------------------

    pub fn set_connect_reply(&self, code: i32, text: &str) {
        *self.connect_reply.lock() = TransportReply::new(code, text);
    }

    pub fn set_submit_reply(&self, code: i32, text: &str) {
        *self.submit_reply.lock() = TransportReply::new(code, text);
    }

    /// The next connect/subscribe/unsubscribe/disconnect call returns `Err`.
    pub fn raise_next(&self, msg: &str) {
        *self.raise.lock() = Some(msg.to_string());
    }

    /// Deliver the ack from inside the next subscribe or unsubscribe call.
    pub fn ack_inline(&self, reason_codes: Vec<u8>) {
        *self.inline_ack.lock() = Some(reason_codes);
    }

    // -- inspection ---------------------------------------------------------

    pub fn has_listener(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn loop_starts(&self) -> usize {
        self.loop_starts.load(Ordering::SeqCst)
    }

    pub fn loop_stops(&self) -> usize {
        self.loop_stops.load(Ordering::SeqCst)
    }

    pub fn last_connect(&self) -> Option<ConnectOptions> {
        self.last_connect.lock().clone()
    }

    pub fn subscribe_calls(&self) -> Vec<(CorrelationId, Vec<(String, QoS)>)> {
        self.subscribes.lock().clone()
    }

    pub fn unsubscribe_calls(&self) -> Vec<(CorrelationId, Vec<String>)> {
        self.unsubscribes.lock().clone()
    }

    /// Subscribe calls not yet handed out, as `(id, topic count)`.
    pub fn take_unacked_subscribes(&self) -> Vec<(CorrelationId, usize)> {
        let calls = self.subscribes.lock();
        let mut cursor = self.acked_cursor.lock();
        let batch = calls[*cursor..].iter().map(|(id, topics)| (*id, topics.len())).collect();
        *cursor = calls.len();
        batch
    }

    // -- delivery side ------------------------------------------------------

    fn listener(&self) -> Arc<dyn TransportListener> {
        self.listener.lock().clone().expect("listener not installed")
    }

    pub fn deliver_message(&self, topic: &str, payload: &[u8]) {
        self.listener().on_message(topic, payload);
    }

    pub fn deliver_connack(&self, code: i32, reason: &str) {
        self.listener().on_connect_ack(code, reason);
    }

    pub fn deliver_suback(&self, id: CorrelationId, reason_codes: &[u8]) {
        self.listener().on_subscribe_ack(id, reason_codes);
    }

    pub fn deliver_unsuback(&self, id: CorrelationId, reason_codes: &[u8]) {
        self.listener().on_unsubscribe_ack(id, reason_codes);
    }

    fn check_raise(&self) -> Result<()> {
        match self.raise.lock().take() {
            Some(msg) => Err(anyhow!(msg)),
            None => Ok(()),
        }
    }

    fn allocate(&self) -> CorrelationId {
        CorrelationId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Transport for MockTransport {
    fn set_listener(&self, listener: Arc<dyn TransportListener>) {
        *self.listener.lock() = Some(listener);
    }

    fn connect(&self, options: &ConnectOptions) -> Result<TransportReply> {
        self.check_raise()?;
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_connect.lock() = Some(options.clone());
        let reply = self.connect_reply.lock().clone();
        if reply.is_success() {
            self.connected.store(true, Ordering::SeqCst);
        }
        Ok(reply)
    }

    fn start_loop(&self) -> Result<()> {
        self.loop_starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_loop(&self) -> Result<()> {
        self.loop_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn subscribe(&self, topics: &[(String, QoS)]) -> Result<Submitted> {
        self.check_raise()?;
        let id = self.allocate();
        let reply = self.submit_reply.lock().clone();
        if reply.is_success() {
            self.subscribes.lock().push((id, topics.to_vec()));
            let inline = self.inline_ack.lock().take();
            if let Some(codes) = inline {
                self.deliver_suback(id, &codes);
            }
        }
        Ok(Submitted { reply, id })
    }

    fn unsubscribe(&self, topics: &[String]) -> Result<Submitted> {
        self.check_raise()?;
        let id = self.allocate();
        let reply = self.submit_reply.lock().clone();
        if reply.is_success() {
            self.unsubscribes.lock().push((id, topics.to_vec()));
            let inline = self.inline_ack.lock().take();
            if let Some(codes) = inline {
                self.deliver_unsuback(id, &codes);
            }
        }
        Ok(Submitted { reply, id })
    }

    fn disconnect(&self) -> Result<TransportReply> {
        self.check_raise()?;
        if self.connected.swap(false, Ordering::SeqCst) {
            Ok(TransportReply::success())
        } else {
            Ok(TransportReply::new(NOT_CONNECTED.0, NOT_CONNECTED.1))
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Identity validator returning a fixed verdict.
pub struct StaticIdentity {
    verdict: IdentityVerdict,
    calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl StaticIdentity {
    pub fn new(verdict: IdentityVerdict) -> Self {
        Self { verdict, calls: AtomicUsize::new(0), fail_next: AtomicBool::new(false) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the next check fail as if the service were unreachable.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityValidator for StaticIdentity {
    async fn validate(&self, _client_id: &str, _token: &str) -> Result<IdentityVerdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(self.verdict.clone())
    }
}
