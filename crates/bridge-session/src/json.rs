//! JSON façade over [`SessionManager`].
//!
//! Accepts request bodies as JSON text and returns responses and ack events
//! as JSON text, for callers that sit across a language or process boundary.

use std::sync::Arc;

use bridge_core::error::BridgeError;
use bridge_core::status::{self, message};
use bridge_core::types::*;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::session::{AckHandler, SessionManager};

/// Callback receiving every ack event as JSON text.
pub type JsonAckHandler = Arc<dyn Fn(&str) + Send + Sync>;

pub struct JsonBridge {
    session: Arc<SessionManager>,
}

impl JsonBridge {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Forward ack events to `handler` as JSON, or clear it with `None`.
    pub fn set_ack_handler(&self, handler: Option<JsonAckHandler>) {
        let forward = handler.map(|h| {
            let forward: AckHandler = Arc::new(move |event: &AckEvent| h(&event.to_json()));
            forward
        });
        self.session.set_ack_handler(forward);
    }

    /// `{"host", "port", "token"}` → `{"status", "message"}`
    pub async fn connect(&self, request: &str) -> String {
        let request: ConnectRequest = match parse(request) {
            Ok(r) => r,
            Err(e) => return self.reject::<StatusResponse>("connect", e).to_json(),
        };
        self.session.connect(&request).await.to_json()
    }

    /// `{"subscriptionList": [...]}` → `{"status", "message", "failedTopics"}`
    pub fn subscribe(&self, category: Category, request: &str) -> String {
        let request: SubscribeRequest = match parse(request) {
            Ok(r) => r,
            Err(e) => return self.reject::<SubscriptionResponse>("subscribe", e).to_json(),
        };
        match request.subscription_list {
            Some(Some(list)) => self.session.subscribe(category, &list).to_json(),
            Some(None) => count_out_of_bounds(),
            None => {
                let err = BridgeError::MissingField("subscriptionList".into());
                self.reject::<SubscriptionResponse>("subscribe", err).to_json()
            }
        }
    }

    /// `{"unsubscriptionList": [...]}` → `{"status", "message", "failedTopics"}`
    pub fn unsubscribe(&self, category: Category, request: &str) -> String {
        let request: UnsubscribeRequest = match parse(request) {
            Ok(r) => r,
            Err(e) => return self.reject::<SubscriptionResponse>("unsubscribe", e).to_json(),
        };
        match request.unsubscription_list {
            Some(Some(list)) => self.session.unsubscribe(category, &list).to_json(),
            Some(None) => count_out_of_bounds(),
            None => {
                let err = BridgeError::MissingField("unsubscriptionList".into());
                self.reject::<SubscriptionResponse>("unsubscribe", err).to_json()
            }
        }
    }

    pub fn disconnect(&self) -> String {
        self.session.disconnect().to_json()
    }

    /// Build the operation's own response shape for a request-level failure.
    ///
    /// An empty request is routine and only logged; everything else also goes
    /// to the error handler.
    fn reject<R>(&self, op: &str, err: BridgeError) -> R
    where
        R: for<'a> From<&'a BridgeError>,
    {
        match err {
            BridgeError::NullRequest => {
                warn!("{op}: empty request");
                R::from(&err)
            }
            err => self.session.fail(op, err),
        }
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, BridgeError> {
    let body = body.trim();
    if body.is_empty() || body == "null" {
        return Err(BridgeError::NullRequest);
    }
    Ok(serde_json::from_str(body)?)
}

fn count_out_of_bounds() -> String {
    SubscriptionResponse::rejected(status::TOPIC_COUNT_OUT_OF_BOUNDS, message::TOPIC_COUNT_OUT_OF_BOUNDS).to_json()
}

#[cfg(test)]
mod tests {
    use bridge_core::config::SessionConfig;
    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use super::*;
    use crate::identity::{IdentityVerdict, make_token};
    use crate::testing::{MockTransport, StaticIdentity};

    fn bridge() -> (JsonBridge, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let identity = Arc::new(StaticIdentity::new(IdentityVerdict::Accepted));
        let session = SessionManager::new(SessionConfig::default(), transport.clone(), identity).unwrap();
        (JsonBridge::new(Arc::new(session)), transport)
    }

    fn value(s: &str) -> Value {
        serde_json::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn connect_round_trip() {
        let (bridge, transport) = bridge();
        let body = json!({"host": "bridge.example.com", "port": 9906, "token": make_token("AB1234")}).to_string();
        assert_eq!(value(&bridge.connect(&body).await), json!({"status": 0, "message": "No error."}));
        assert_eq!(transport.connect_calls(), 1);
    }

    #[tokio::test]
    async fn connect_request_failures() {
        let (bridge, transport) = bridge();
        assert_eq!(value(&bridge.connect("  ").await)["status"], 101);
        assert_eq!(value(&bridge.connect("null").await)["status"], 101);

        let bad = value(&bridge.connect("{host").await);
        assert_eq!(bad["status"], -1);
        assert!(bad["message"].as_str().unwrap().starts_with("Invalid JSON"));

        let missing = value(&bridge.connect(r#"{"host": "h", "port": 1}"#).await);
        assert_eq!(missing, json!({"status": -1, "message": "The parameter 'token' should not be empty"}));
        assert_eq!(transport.connect_calls(), 0);
    }

    #[test]
    fn subscribe_list_handling() {
        let (bridge, transport) = bridge();
        let resp = value(&bridge.subscribe(Category::Feed, r#"{"subscriptionList": ["nseeq/2885", "NSE"]}"#));
        assert_eq!(resp["status"], 0);
        assert_eq!(resp["failedTopics"], json!([{"topic": "NSE", "resultCode": 104, "result": "Invalid topic"}]));
        assert_eq!(transport.subscribe_calls().len(), 1);

        assert_eq!(value(&bridge.subscribe(Category::Feed, r#"{"subscriptionList": null}"#))["status"], 102);
        assert_eq!(value(&bridge.subscribe(Category::Feed, r#"{"subscriptionList": []}"#))["status"], 102);
        assert_eq!(
            value(&bridge.subscribe(Category::Feed, "{}")),
            json!({"status": -1, "message": "The parameter 'subscriptionList' should not be empty", "failedTopics": []})
        );
        assert_eq!(
            value(&bridge.subscribe(Category::Feed, "")),
            json!({"status": 101, "message": "Request cannot be null", "failedTopics": []})
        );
        let bad = value(&bridge.subscribe(Category::Feed, "{bad"));
        assert_eq!(bad["status"], -1);
        assert_eq!(bad["failedTopics"], json!([]));
        assert_eq!(transport.subscribe_calls().len(), 1);
    }

    #[test]
    fn unsubscribe_list_handling() {
        let (bridge, transport) = bridge();
        let resp = value(&bridge.unsubscribe(Category::Index, r#"{"unsubscriptionList": ["nsefo/999920019"]}"#));
        assert_eq!(resp["status"], 0);
        assert_eq!(transport.unsubscribe_calls().len(), 1);
        assert_eq!(value(&bridge.unsubscribe(Category::Index, r#"{"unsubscriptionList": ["X"]}"#))["status"], 103);
        assert_eq!(value(&bridge.unsubscribe(Category::Index, r#"{"subscriptionList": []}"#))["status"], -1);
        for body in ["", "null", "[1,", r#"{"unsubscriptionList": 5}"#] {
            let resp = value(&bridge.unsubscribe(Category::Index, body));
            assert!(resp["failedTopics"].is_array(), "{body}: {resp}");
        }
    }

    #[test]
    fn acks_forwarded_as_json() {
        let (bridge, transport) = bridge();
        let seen: Arc<Mutex<Vec<String>>> = Default::default();
        let sink = Arc::clone(&seen);
        bridge.set_ack_handler(Some(Arc::new(move |s: &str| sink.lock().push(s.to_string()))));

        bridge.subscribe(Category::Feed, r#"{"subscriptionList": ["nseeq/2885"]}"#);
        let id = transport.subscribe_calls()[0].0;
        transport.deliver_suback(id, &[0]);

        let acks = seen.lock();
        assert_eq!(
            value(&acks[0]),
            json!({
                "packetType": 9,
                "packetName": "SUBACK",
                "subscriptionResult": [{"topic": "nseeq/2885", "resultCode": 0, "result": "Granted"}]
            })
        );
    }

    #[test]
    fn disconnect_when_not_connected() {
        let (bridge, _) = bridge();
        let resp = value(&bridge.disconnect());
        assert_eq!(resp["status"], 4);
    }
}
