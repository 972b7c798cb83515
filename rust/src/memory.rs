// In-process stand-in for the platform services.
//
// Used by tests and by hosts without a real backing store. Calls are recorded; once an
// `EventSink` is connected, the backend also answers the way the real services do (listener
// registration fires the current user, subscriptions replay existing messages, uploads and
// config fetches resolve according to the scripted outcome).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::backend::{
    AuthProvider, AuthUser, BackendError, BackendEvent, FeedEvent, FeedStore, ObjectStorage,
    RemoteConfigService, SignInOutcome,
};
use crate::state::ChatMessage;
use crate::updates::EventSink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Resolve with `<base_url>/<destination_path>`.
    Succeed { base_url: String },
    Fail(String),
    /// Never resolve; tests complete the upload by hand.
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOutcome {
    Values(HashMap<String, String>),
    Fail(String),
}

#[derive(Debug)]
struct Inner {
    sink: Option<EventSink>,
    user: Option<AuthUser>,
    listener_registered: bool,
    add_listener_calls: usize,
    sign_out_calls: usize,
    delete_account_calls: usize,

    store: Vec<(String, ChatMessage)>,
    subscriptions: HashMap<u64, String>, // subscription_id -> path
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    publish_error: Option<String>,

    uploads: Vec<(u64, String, String)>,
    upload_outcome: UploadOutcome,

    fetch_requests: Vec<u64>,
    config_outcome: ConfigOutcome,
    // A fetch issued before a sink was connected is answered on connect.
    pending_fetch: bool,
}

#[derive(Debug)]
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sink: None,
                user: None,
                listener_registered: false,
                add_listener_calls: 0,
                sign_out_calls: 0,
                delete_account_calls: 0,
                store: Vec::new(),
                subscriptions: HashMap::new(),
                subscribe_calls: 0,
                unsubscribe_calls: 0,
                publish_error: None,
                uploads: Vec::new(),
                upload_outcome: UploadOutcome::Succeed {
                    base_url: "memory://storage".to_string(),
                },
                fetch_requests: Vec::new(),
                config_outcome: ConfigOutcome::Values(HashMap::new()),
                pending_fetch: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    fn send_all(sink: Option<EventSink>, events: Vec<BackendEvent>) {
        if let Some(sink) = sink {
            for event in events {
                sink.send(event);
            }
        }
    }

    /// Start answering calls through `sink`. Flushes a config fetch issued earlier.
    pub fn connect(&self, sink: EventSink) {
        let mut inner = self.lock();
        inner.sink = Some(sink.clone());
        if std::mem::take(&mut inner.pending_fetch) {
            let event = config_event(&inner.config_outcome);
            drop(inner);
            sink.send(event);
        }
    }

    // Scripting

    pub fn set_upload_outcome(&self, outcome: UploadOutcome) {
        self.lock().upload_outcome = outcome;
    }

    pub fn set_config_outcome(&self, outcome: ConfigOutcome) {
        self.lock().config_outcome = outcome;
    }

    pub fn set_publish_error(&self, reason: Option<&str>) {
        self.lock().publish_error = reason.map(str::to_string);
    }

    /// Completes a sign-in flow as `display_name`.
    pub fn complete_sign_in(&self, display_name: &str) {
        let mut inner = self.lock();
        let user = AuthUser {
            display_name: Some(display_name.to_string()),
        };
        inner.user = Some(user.clone());
        let mut events = Vec::new();
        if inner.listener_registered {
            events.push(BackendEvent::AuthStateChanged { user: Some(user) });
        }
        events.push(BackendEvent::SignInFinished {
            outcome: SignInOutcome::Ok,
        });
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, events);
    }

    /// Ends a sign-in flow without a user (cancelled or offline).
    pub fn abort_sign_in(&self, outcome: SignInOutcome) {
        let sink = self.lock().sink.clone();
        Self::send_all(sink, vec![BackendEvent::SignInFinished { outcome }]);
    }

    /// Deletes a message from the store, notifying live subscriptions on its path.
    pub fn remove_message(&self, path: &str, message: &ChatMessage) {
        let mut inner = self.lock();
        let Some(idx) = inner
            .store
            .iter()
            .position(|(p, m)| p == path && m == message)
        else {
            return;
        };
        inner.store.remove(idx);
        let events = inner
            .subscriptions
            .iter()
            .filter(|(_, p)| p.as_str() == path)
            .map(|(id, _)| BackendEvent::Feed {
                subscription_id: *id,
                event: FeedEvent::Removed {
                    message: message.clone(),
                },
            })
            .collect();
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, events);
    }

    /// Cancels every live subscription, as a store does when access is revoked.
    pub fn cancel_subscriptions(&self, reason: &str) {
        let mut inner = self.lock();
        let events = inner
            .subscriptions
            .drain()
            .map(|(id, _)| BackendEvent::Feed {
                subscription_id: id,
                event: FeedEvent::Cancelled {
                    reason: reason.to_string(),
                },
            })
            .collect();
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, events);
    }

    // Inspection

    pub fn listener_registered(&self) -> bool {
        self.lock().listener_registered
    }

    pub fn add_listener_calls(&self) -> usize {
        self.lock().add_listener_calls
    }

    pub fn sign_out_calls(&self) -> usize {
        self.lock().sign_out_calls
    }

    pub fn delete_account_calls(&self) -> usize {
        self.lock().delete_account_calls
    }

    pub fn published(&self) -> Vec<(String, ChatMessage)> {
        self.lock().store.clone()
    }

    pub fn active_subscriptions(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.lock().subscriptions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn subscribe_calls(&self) -> usize {
        self.lock().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.lock().unsubscribe_calls
    }

    /// `(request_id, source_uri, destination_path)` per upload, in call order.
    pub fn uploads(&self) -> Vec<(u64, String, String)> {
        self.lock().uploads.clone()
    }

    pub fn fetch_requests(&self) -> Vec<u64> {
        self.lock().fetch_requests.clone()
    }
}

fn config_event(outcome: &ConfigOutcome) -> BackendEvent {
    match outcome {
        ConfigOutcome::Values(values) => BackendEvent::ConfigFetched {
            values: values.clone(),
        },
        ConfigOutcome::Fail(reason) => BackendEvent::ConfigFetchFailed {
            reason: reason.clone(),
        },
    }
}

impl AuthProvider for InMemoryBackend {
    fn add_state_listener(&self) {
        let mut inner = self.lock();
        inner.listener_registered = true;
        inner.add_listener_calls += 1;
        let event = BackendEvent::AuthStateChanged {
            user: inner.user.clone(),
        };
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, vec![event]);
    }

    fn remove_state_listener(&self) {
        self.lock().listener_registered = false;
    }

    fn sign_out(&self) {
        let mut inner = self.lock();
        inner.sign_out_calls += 1;
        inner.user = None;
        let registered = inner.listener_registered;
        let sink = inner.sink.clone();
        drop(inner);
        if registered {
            Self::send_all(sink, vec![BackendEvent::AuthStateChanged { user: None }]);
        }
    }

    fn delete_account(&self) {
        let mut inner = self.lock();
        inner.delete_account_calls += 1;
        inner.user = None;
        let registered = inner.listener_registered;
        let sink = inner.sink.clone();
        drop(inner);
        if registered {
            Self::send_all(sink, vec![BackendEvent::AuthStateChanged { user: None }]);
        }
    }
}

impl FeedStore for InMemoryBackend {
    fn publish(&self, path: String, message: ChatMessage) -> Result<(), BackendError> {
        let mut inner = self.lock();
        if let Some(reason) = inner.publish_error.clone() {
            return Err(BackendError::Unavailable { reason });
        }
        inner.store.push((path.clone(), message.clone()));
        let events = inner
            .subscriptions
            .iter()
            .filter(|(_, p)| **p == path)
            .map(|(id, _)| BackendEvent::Feed {
                subscription_id: *id,
                event: FeedEvent::Added {
                    message: message.clone(),
                },
            })
            .collect();
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, events);
        Ok(())
    }

    fn subscribe(&self, path: String, subscription_id: u64) {
        let mut inner = self.lock();
        inner.subscribe_calls += 1;
        // New listeners first see every existing child, in insertion order.
        let events = inner
            .store
            .iter()
            .filter(|(p, _)| *p == path)
            .map(|(_, m)| BackendEvent::Feed {
                subscription_id,
                event: FeedEvent::Added { message: m.clone() },
            })
            .collect();
        inner.subscriptions.insert(subscription_id, path);
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, events);
    }

    fn unsubscribe(&self, subscription_id: u64) {
        let mut inner = self.lock();
        inner.unsubscribe_calls += 1;
        inner.subscriptions.remove(&subscription_id);
    }
}

impl ObjectStorage for InMemoryBackend {
    fn upload(&self, request_id: u64, source_uri: String, destination_path: String) {
        let mut inner = self.lock();
        inner
            .uploads
            .push((request_id, source_uri, destination_path.clone()));
        let event = match &inner.upload_outcome {
            UploadOutcome::Succeed { base_url } => BackendEvent::UploadSucceeded {
                request_id,
                download_url: format!("{}/{}", base_url.trim_end_matches('/'), destination_path),
            },
            UploadOutcome::Fail(reason) => BackendEvent::UploadFailed {
                request_id,
                reason: reason.clone(),
            },
            UploadOutcome::Hold => return,
        };
        let sink = inner.sink.clone();
        drop(inner);
        Self::send_all(sink, vec![event]);
    }
}

impl RemoteConfigService for InMemoryBackend {
    fn fetch(&self, cache_expiration_seconds: u64) {
        let mut inner = self.lock();
        inner.fetch_requests.push(cache_expiration_seconds);
        let Some(sink) = inner.sink.clone() else {
            inner.pending_fetch = true;
            return;
        };
        let event = config_event(&inner.config_outcome);
        drop(inner);
        sink.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updates::CoreMsg;

    fn connected() -> (InMemoryBackend, flume::Receiver<CoreMsg>) {
        let (tx, rx) = flume::unbounded();
        let backend = InMemoryBackend::new();
        backend.connect(EventSink::new(tx));
        (backend, rx)
    }

    fn backend_events(rx: &flume::Receiver<CoreMsg>) -> Vec<BackendEvent> {
        rx.try_iter()
            .filter_map(|m| match m {
                CoreMsg::Backend(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn subscribe_replays_existing_messages_in_order() {
        let (backend, rx) = connected();
        let a = ChatMessage::text("a", "alice");
        let b = ChatMessage::photo("memory://x", "bob");
        backend.publish("messages".into(), a.clone()).unwrap();
        backend.publish("other".into(), ChatMessage::text("x", "z")).unwrap();
        backend.publish("messages".into(), b.clone()).unwrap();

        backend.subscribe("messages".into(), 7);
        assert_eq!(
            backend_events(&rx),
            vec![
                BackendEvent::Feed {
                    subscription_id: 7,
                    event: FeedEvent::Added { message: a },
                },
                BackendEvent::Feed {
                    subscription_id: 7,
                    event: FeedEvent::Added { message: b },
                },
            ]
        );
    }

    #[test]
    fn fetch_before_connect_is_answered_on_connect() {
        let backend = InMemoryBackend::new();
        backend.set_config_outcome(ConfigOutcome::Fail("offline".into()));
        backend.fetch(3600);

        let (tx, rx) = flume::unbounded();
        backend.connect(EventSink::new(tx));
        assert_eq!(
            backend_events(&rx),
            vec![BackendEvent::ConfigFetchFailed {
                reason: "offline".into()
            }]
        );
    }

    #[test]
    fn sign_out_notifies_only_registered_listener() {
        let (backend, rx) = connected();
        backend.sign_out();
        assert!(backend_events(&rx).is_empty());

        backend.add_state_listener();
        backend.sign_out();
        assert_eq!(
            backend_events(&rx),
            vec![
                BackendEvent::AuthStateChanged { user: None },
                BackendEvent::AuthStateChanged { user: None },
            ]
        );
    }

    #[test]
    fn successful_upload_reports_download_url() {
        let (backend, rx) = connected();
        backend.upload(3, "content://x/photo123.jpg".into(), "chat-photos/photo123.jpg".into());
        assert_eq!(
            backend_events(&rx),
            vec![BackendEvent::UploadSucceeded {
                request_id: 3,
                download_url: "memory://storage/chat-photos/photo123.jpg".into(),
            }]
        );
    }
}
