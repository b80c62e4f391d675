//! Session manager.
//!
//! Owns the callback registry and pending request table for one transport
//! connection, exposes connect/subscribe/unsubscribe/disconnect, and receives
//! every transport callback.
//!
//! # Architecture
//!
//! ```text
//! caller threads                       delivery thread
//! ──────────────                       ───────────────
//! SessionManager ──► Transport ──────► Shared (TransportListener)
//!   │ subscribe()                        │ on_message()      ──► Dispatcher ──► DataHandler
//!   │   validate ─► transport call       │ on_subscribe_ack() ─► PendingRequests ─► AckHandler
//!   │   record id ─► PendingRequests     │ on_*_ack()         ─► AckHandler
//!   └ register_handler() ─► Dispatcher   └ defects            ─► ErrorHandler
//! ```
//!
//! Public operations never fail across the boundary: every outcome, internal
//! exceptions included, comes back as a response value. Exceptions and
//! absorbed defects are also forwarded to the error handler, which is called
//! with no session lock held.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use bridge_core::config::SessionConfig;
use bridge_core::error::BridgeError;
use bridge_core::status::{self, message};
use bridge_core::types::*;
use bridge_core::topic;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{Dispatch, Dispatcher, panic_message};
use crate::identity::{self, Credentials, HttpIdentityValidator, IdentityValidator, IdentityVerdict};
use crate::pending::{ParkedAck, PendingEntry, PendingRequests, Recorded, Resolution};
use crate::registry::DataHandler;
use crate::transport::{ConnectOptions, CorrelationId, Transport, TransportListener};

/// Callback invoked for every acknowledgment event.
pub type AckHandler = Arc<dyn Fn(&AckEvent) + Send + Sync>;

/// Callback invoked for exceptions and absorbed defects.
///
/// Parameters: `(status_code, message)`
pub type ErrorHandler = Arc<dyn Fn(i32, &str) + Send + Sync>;

// ---------------------------------------------------------------------------
// Shared: state reachable from both caller threads and the delivery thread
// ---------------------------------------------------------------------------

struct Shared {
    namespaces: Arc<NamespaceTable>,
    dispatcher: Dispatcher,
    pending: PendingRequests,
    ack_handler: RwLock<Option<AckHandler>>,
    error_handler: RwLock<Option<ErrorHandler>>,
}

impl Shared {
    fn emit(&self, event: AckEvent) {
        let handler = self.ack_handler.read().clone();
        let Some(handler) = handler else {
            debug!("no ack handler, dropping {}", event.packet_type().name());
            return;
        };
        if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| handler(&event))) {
            let msg = format!(
                "ack handler panicked on {}: {}",
                event.packet_type().name(),
                panic_message(cause.as_ref())
            );
            error!("{msg}");
            self.report_error(status::INTERNAL_ERROR, &msg);
        }
    }

    fn report_error(&self, code: i32, msg: &str) {
        let handler = self.error_handler.read().clone();
        if let Some(handler) = handler {
            if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(|| handler(code, msg))) {
                error!("error handler panicked: {}", panic_message(cause.as_ref()));
            }
        }
    }

    /// Log, notify the error handler, and build the failure response.
    fn fail<T>(&self, op: &str, err: BridgeError) -> T
    where
        T: for<'a> From<&'a BridgeError>,
    {
        error!("{op} failed: {err}");
        self.report_error(err.status(), &err.to_string());
        T::from(&err)
    }

    fn resolve_ack(&self, id: CorrelationId, kind: AckKind, reason_codes: &[u8]) {
        match self.pending.resolve(id, kind, reason_codes) {
            Resolution::Resolved(entry) => self.complete(id, entry, reason_codes),
            Resolution::Parked => debug!("{kind} ack {id} parked until its request is recorded"),
            Resolution::KindMismatch { recorded } => {
                let msg = format!("{kind} ack for correlation id {id} recorded as {recorded}");
                error!("{msg}");
                self.report_error(status::INTERNAL_ERROR, &msg);
            }
            Resolution::Unknown => self.report_unknown(id, kind),
        }
    }

    /// Turn a resolved entry and its reason codes into an ack event.
    fn complete(&self, id: CorrelationId, entry: PendingEntry, reason_codes: &[u8]) {
        if reason_codes.len() != entry.topics.len() {
            let msg = format!(
                "{} ack {id} carried {} reason code(s) for {} topic(s)",
                entry.kind,
                reason_codes.len(),
                entry.topics.len()
            );
            warn!("{msg}");
            self.report_error(status::INTERNAL_ERROR, &msg);
        }

        let pairs = entry.topics.iter().zip(reason_codes.iter().copied());
        let event = match entry.kind {
            AckKind::Subscribe => AckEvent::subscribe(
                pairs.map(|(t, code)| TopicResult::from_reason(topic_suffix(t), code)).collect(),
            ),
            AckKind::Unsubscribe => AckEvent::unsubscribe(
                pairs.map(|(t, code)| TopicResult::from_release(topic_suffix(t), code)).collect(),
            ),
        };
        debug!("{} ack {id} resolved ({} topic(s))", entry.kind, entry.topics.len());
        self.emit(event);
    }

    fn settle(&self, id: CorrelationId, recorded: Recorded, orphans: Vec<ParkedAck>) {
        if let Recorded::ResolvedEarly { entry, reason_codes } = recorded {
            self.complete(id, entry, &reason_codes);
        }
        self.report_orphans(orphans);
    }

    fn report_orphans(&self, orphans: Vec<ParkedAck>) {
        for orphan in orphans {
            self.report_unknown(orphan.id, orphan.kind);
        }
    }

    fn report_unknown(&self, id: CorrelationId, kind: AckKind) {
        let msg = format!("{kind} ack for unknown correlation id {id}");
        error!("{msg}");
        self.report_error(status::INTERNAL_ERROR, &msg);
    }
}

impl TransportListener for Shared {
    fn on_message(&self, topic: &str, payload: &[u8]) {
        match self.dispatcher.dispatch(topic, payload) {
            Dispatch::Delivered(category) => debug!("[{category}] delivered {} byte(s)", payload.len()),
            Dispatch::HandlerPanicked { category, reason } => {
                let msg = format!("[{category}] data handler panicked on {topic}: {reason}");
                error!("{msg}");
                self.report_error(status::INTERNAL_ERROR, &msg);
            }
            Dispatch::NoHandler(_) | Dispatch::Unrouted => {}
        }
    }

    fn on_connect_ack(&self, code: i32, reason: &str) {
        info!("connect ack: code={code} ({reason})");
        self.emit(AckEvent::connect(code, reason));
    }

    fn on_disconnect_ack(&self, code: i32, reason: &str) {
        info!("disconnect ack: code={code} ({reason})");
        self.emit(AckEvent::disconnect(code, reason));
    }

    fn on_subscribe_ack(&self, id: CorrelationId, reason_codes: &[u8]) {
        self.resolve_ack(id, AckKind::Subscribe, reason_codes);
    }

    fn on_unsubscribe_ack(&self, id: CorrelationId, reason_codes: &[u8]) {
        self.resolve_ack(id, AckKind::Unsubscribe, reason_codes);
    }
}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// One pub/sub session over a caller-supplied transport.
///
/// All operations take `&self` and may be called from multiple threads.
pub struct SessionManager {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    identity: Arc<dyn IdentityValidator>,
    shared: Arc<Shared>,
}

impl SessionManager {
    /// Create a session. The namespace table is fixed from here on.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        identity: Arc<dyn IdentityValidator>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let namespaces = Arc::new(NamespaceTable::new(&config.environment));
        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(Arc::clone(&namespaces)),
            namespaces,
            pending: PendingRequests::new(),
            ack_handler: RwLock::new(None),
            error_handler: RwLock::new(None),
        });
        // Installed once, before any call that could produce an ack.
        transport.set_listener(Arc::clone(&shared) as Arc<dyn TransportListener>);
        info!("session created (environment={})", config.environment);
        Ok(Self { config, transport, identity, shared })
    }

    /// Create a session that validates tokens against `config.identity_url`.
    pub fn with_http_identity(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Self, BridgeError> {
        let timeout = Duration::from_secs(config.identity_timeout_secs);
        let identity = HttpIdentityValidator::new(config.identity_url.clone(), timeout)
            .map_err(|e| BridgeError::Config(format!("{e:#}")))?;
        Self::new(config, transport, Arc::new(identity))
    }

    // -----------------------------------------------------------------------
    // Handler registration
    // -----------------------------------------------------------------------

    /// Install or clear (`None`) the data handler for a category.
    pub fn register_handler(&self, category: Category, handler: Option<DataHandler>) {
        let replaced = self.shared.dispatcher.register(category, handler).is_some();
        debug!("[{category}] handler registration updated (replaced={replaced})");
    }

    pub fn set_ack_handler(&self, handler: Option<AckHandler>) {
        *self.shared.ack_handler.write() = handler;
    }

    pub fn set_error_handler(&self, handler: Option<ErrorHandler>) {
        *self.shared.error_handler.write() = handler;
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Authenticate and connect.
    ///
    /// Fails fast with status 105 if the transport already reports connected.
    /// The only network round trip is the identity check; the transport
    /// connect itself completes through the connect ack.
    pub async fn connect(&self, request: &ConnectRequest) -> ConnectResponse {
        if request.host.trim().is_empty() {
            return self.shared.fail("connect", BridgeError::MissingField("host".into()));
        }
        if request.token.trim().is_empty() {
            return self.shared.fail("connect", BridgeError::MissingField("token".into()));
        }
        if self.transport.is_connected() {
            warn!("connect refused: already connected");
            return StatusResponse::new(status::ALREADY_CONNECTED, message::ALREADY_CONNECTED);
        }

        let client_id = match identity::decode_client_id(&request.token) {
            Ok(id) => id,
            Err(e) => {
                warn!("connect refused: {e}");
                return StatusResponse::from(&e);
            }
        };

        match self.identity.validate(&client_id, &request.token).await {
            Ok(IdentityVerdict::Accepted) => debug!("identity accepted for {client_id}"),
            Ok(IdentityVerdict::Rejected(reason)) => {
                warn!("identity rejected for {client_id}: {reason}");
                return StatusResponse::new(status::IDENTITY_REJECTED, reason);
            }
            Err(e) => {
                return self.shared.fail("identity check", BridgeError::Identity(format!("{e:#}")));
            }
        }

        let credentials = Credentials::from_token(&client_id, &request.token);
        let options = ConnectOptions {
            host: request.host.clone(),
            port: request.port,
            principal: credentials.principal,
            secret: credentials.secret,
            keep_alive: Duration::from_secs(u64::from(self.config.keep_alive_secs)),
            clean_session: self.config.clean_session,
        };

        info!("connecting to {}:{} as {client_id}", options.host, options.port);
        let reply = match self.transport.connect(&options) {
            Ok(reply) => reply,
            Err(e) => return self.shared.fail("connect", BridgeError::transport(&e)),
        };

        if reply.is_success() {
            if let Err(e) = self.transport.start_loop() {
                return self.shared.fail("delivery loop start", BridgeError::transport(&e));
            }
        } else {
            warn!("transport refused connect: code={} ({})", reply.code, reply.text);
        }
        StatusResponse::new(reply.code, reply.text)
    }

    /// Disconnect and stop the delivery loop.
    ///
    /// The loop is stopped whatever the disconnect call reports, so no
    /// callback reaches application code after this returns.
    pub fn disconnect(&self) -> DisconnectResponse {
        let result = self.transport.disconnect();
        if let Err(e) = self.transport.stop_loop() {
            let err = BridgeError::transport(&e);
            warn!("delivery loop stop failed: {err}");
            self.shared.report_error(err.status(), &err.to_string());
        }
        match result {
            Ok(reply) => {
                info!("disconnect: code={} ({})", reply.code, reply.text);
                StatusResponse::new(reply.code, reply.text)
            }
            Err(e) => self.shared.fail("disconnect", BridgeError::transport(&e)),
        }
    }

    // -----------------------------------------------------------------------
    // Subscriptions
    // -----------------------------------------------------------------------

    /// Submit a subscribe batch. Returns once submitted, not once acked.
    pub fn subscribe<S: AsRef<str>>(&self, category: Category, suffixes: &[S]) -> SubscribeResponse {
        self.submit(category, suffixes, AckKind::Subscribe)
    }

    /// Submit an unsubscribe batch. Returns once submitted, not once acked.
    pub fn unsubscribe<S: AsRef<str>>(&self, category: Category, suffixes: &[S]) -> UnsubscribeResponse {
        self.submit(category, suffixes, AckKind::Unsubscribe)
    }

    fn submit<S: AsRef<str>>(&self, category: Category, suffixes: &[S], kind: AckKind) -> SubscriptionResponse {
        if suffixes.is_empty() || suffixes.len() > self.config.max_topics_per_request {
            let (code, text) = (status::TOPIC_COUNT_OUT_OF_BOUNDS, message::TOPIC_COUNT_OUT_OF_BOUNDS);
            return SubscriptionResponse::rejected(code, text);
        }

        let (valid, invalid) = topic::partition(suffixes);
        let failed: Vec<TopicResult> = invalid.into_iter().map(TopicResult::invalid).collect();
        if !failed.is_empty() {
            debug!("[{category}] {kind}: {} invalid suffix(es) excluded", failed.len());
        }
        if valid.is_empty() {
            let msg = match kind {
                AckKind::Subscribe => message::SUBSCRIBE_FAILED,
                AckKind::Unsubscribe => message::UNSUBSCRIBE_FAILED,
            };
            return SubscriptionResponse::new(status::NOTHING_TO_SUBMIT, msg, failed);
        }

        let topics: Vec<String> = valid.iter().map(|s| self.shared.namespaces.topic(category, s)).collect();

        let in_flight = self.shared.pending.begin();
        let call = match kind {
            AckKind::Subscribe => {
                let qos = self.config.subscribe_qos;
                let requested: Vec<(String, QoS)> = topics.iter().map(|t| (t.clone(), qos)).collect();
                self.transport.subscribe(&requested)
            }
            AckKind::Unsubscribe => self.transport.unsubscribe(&topics),
        };

        let submitted = match call {
            Ok(submitted) if submitted.reply.is_success() => submitted,
            Ok(submitted) => {
                self.shared.report_orphans(in_flight.abandon());
                let reply = &submitted.reply;
                warn!("[{category}] transport refused {kind}: code={} ({})", reply.code, reply.text);
                return SubscriptionResponse::new(submitted.reply.code, submitted.reply.text, failed);
            }
            Err(e) => {
                self.shared.report_orphans(in_flight.abandon());
                return self.shared.fail(kind.label(), BridgeError::transport(&e));
            }
        };

        let id = submitted.id;
        let count = topics.len();
        let (recorded, orphans) = in_flight.record(id, kind, topics);
        debug!("[{category}] {kind} {id} submitted ({count} topic(s))");
        self.shared.settle(id, recorded, orphans);

        let msg = match (failed.is_empty(), kind) {
            (true, _) => submitted.reply.text,
            (false, AckKind::Subscribe) => message::SUBSCRIBE_PARTIAL.to_string(),
            (false, AckKind::Unsubscribe) => message::UNSUBSCRIBE_PARTIAL.to_string(),
        };
        SubscriptionResponse::new(status::ACCEPTED, msg, failed)
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Derived from the transport on every call; never cached.
    pub fn connection_state(&self) -> ConnectionState {
        self.transport.state()
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Requests submitted but not yet acked.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn registered_categories(&self) -> Vec<Category> {
        self.shared.dispatcher.registry().categories()
    }

    pub fn namespaces(&self) -> &NamespaceTable {
        &self.shared.namespaces
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn fail<T>(&self, op: &str, err: BridgeError) -> T
    where
        T: for<'a> From<&'a BridgeError>,
    {
        self.shared.fail(op, err)
    }
}
