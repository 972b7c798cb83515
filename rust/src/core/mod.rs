mod attach;
mod config;
mod config_gate;
mod message_list;
mod session;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use flume::Sender;

use crate::actions::AppAction;
use crate::backend::{
    AuthUser, BackendEvent, Backends, FeedEvent, SignInOutcome, SIGN_IN_PROVIDERS,
};
use crate::state::{AppState, AuthState, BusyState, ChatMessage, LifecycleState, ANONYMOUS};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use attach::AttachmentUpload;
use config_gate::{apply_length_filter, ConfigGate};
use message_list::MessageList;

/// Send is offered iff the compose field has something besides whitespace.
pub(crate) fn is_send_enabled(text: &str) -> bool {
    !text.trim().is_empty()
}

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,
    backends: Backends,

    messages: MessageList,
    auth_listener_registered: bool,
    feed_subscription: Option<u64>,
    feed_subscription_seq: u64,

    config_gate: ConfigGate,

    pending_uploads: HashMap<u64, AttachmentUpload>, // request_id -> upload in flight
    upload_seq: u64,

    toast_dismiss_token: u64,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        backends: Backends,
    ) -> Self {
        let config = config::load_app_config(&data_dir);
        let config_gate = ConfigGate::new(config.developer_mode());

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .expect("tokio runtime");

        let mut this = Self {
            state: AppState::empty(),
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            config,
            runtime,
            backends,
            messages: MessageList::new(),
            auth_listener_registered: false,
            feed_subscription: None,
            feed_subscription_seq: 0,
            config_gate,
            pending_uploads: HashMap::new(),
            upload_seq: 0,
            toast_dismiss_token: 0,
        };
        this.state.config = this.config_gate.snapshot();
        this.state.compose.length_limit = this.config_gate.message_length_limit();

        tracing::info!(
            developer_mode = this.config.developer_mode(),
            messages_path = %this.config.messages_path(),
            "core created"
        );
        this.fetch_config();

        // Ensure FfiApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        self.state.messages = self.messages.as_slice().to_vec();
        self.state.feed_attached = self.feed_subscription.is_some();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_auth(&mut self) {
        self.emit_state();
    }

    fn emit_messages(&mut self) {
        self.emit_state();
    }

    fn emit_compose(&mut self) {
        self.emit_state();
    }

    fn emit_busy(&mut self) {
        self.emit_state();
    }

    fn emit_toast(&mut self) {
        self.emit_state();
    }

    fn emit_lifecycle(&mut self) {
        self.emit_state();
    }

    fn toast(&mut self, msg: impl Into<String>) {
        self.state.toast = Some(msg.into());
        self.toast_dismiss_token = self.toast_dismiss_token.saturating_add(1);
        self.schedule_toast_auto_dismiss(self.toast_dismiss_token);
        self.emit_toast();
    }

    fn schedule_toast_auto_dismiss(&self, token: u64) {
        let tx = self.core_sender.clone();
        let after = Duration::from_millis(self.config.notice_duration_ms());
        self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::ToastAutoDismiss { token },
            )));
        });
    }

    fn handle_toast_auto_dismiss(&mut self, token: u64) {
        // A newer notice owns the slot.
        if token != self.toast_dismiss_token || self.state.toast.is_none() {
            return;
        }
        self.state.toast = None;
        self.emit_toast();
    }

    fn set_busy(&mut self, f: impl FnOnce(&mut BusyState)) {
        let mut next = self.state.busy.clone();
        f(&mut next);
        if next != self.state.busy {
            self.state.busy = next;
            self.emit_busy();
        }
    }

    fn finish(&mut self) {
        if self.state.finished {
            return;
        }
        self.state.finished = true;
        let rev = self.next_rev();
        let _ = self.update_sender.send(AppUpdate::Finish { rev });
        self.emit_lifecycle();
    }

    fn is_destroyed(&self) -> bool {
        self.state.lifecycle == LifecycleState::Destroyed
    }

    fn transition_to(&mut self, next: LifecycleState) -> bool {
        let current = self.state.lifecycle;
        if !current.can_transition_to(next) {
            tracing::warn!(?current, ?next, "lifecycle: ignoring invalid transition");
            return false;
        }
        tracing::info!(?current, ?next, "lifecycle");
        self.state.lifecycle = next;
        true
    }

    fn on_resumed(&mut self) {
        if !self.transition_to(LifecycleState::Resumed) {
            return;
        }
        self.attach_auth_listener();
        self.emit_lifecycle();
    }

    fn on_paused(&mut self) {
        if !self.transition_to(LifecycleState::Paused) {
            return;
        }
        self.stop_foreground_work();
        self.emit_lifecycle();
    }

    fn on_destroyed(&mut self) {
        if !self.transition_to(LifecycleState::Destroyed) {
            return;
        }
        self.stop_foreground_work();
        if !self.pending_uploads.is_empty() {
            tracing::info!(
                count = self.pending_uploads.len(),
                "lifecycle: abandoning uploads in flight"
            );
            self.pending_uploads.clear();
        }
        self.state.busy = BusyState::idle();
        self.emit_lifecycle();
    }

    fn stop_foreground_work(&mut self) {
        self.detach_auth_listener();
        self.detach_feed();
        if !self.messages.is_empty() {
            tracing::debug!(count = self.messages.len(), "clearing message list");
            self.messages.clear();
        }
    }

    fn fetch_config(&mut self) {
        let expiry = self.config_gate.cache_expiration_secs();
        tracing::info!(cache_expiration_secs = expiry, "config: fetching");
        self.backends.remote_config.fetch(expiry);
    }

    fn handle_config_fetched(&mut self, values: HashMap<String, String>) {
        self.config_gate.on_fetched(values);
        self.config_gate.activate_fetched();
        self.apply_retrieved_length_limit();
    }

    fn handle_config_fetch_failed(&mut self, reason: String) {
        tracing::warn!(%reason, "config: remote fetch failed");
        self.apply_retrieved_length_limit();
    }

    fn apply_retrieved_length_limit(&mut self) {
        let limit = self.config_gate.message_length_limit();
        tracing::debug!(message_length = limit, "config: applied");
        self.state.config = self.config_gate.snapshot();
        self.state.compose.length_limit = limit;
        self.emit_compose();
    }

    fn update_compose(&mut self, text: String) {
        let text = apply_length_filter(&text, self.state.compose.length_limit);
        self.state.compose.send_enabled = is_send_enabled(&text);
        self.state.compose.text = text;
        self.emit_compose();
    }

    fn send_message(&mut self) {
        let text = std::mem::take(&mut self.state.compose.text);
        self.state.compose.send_enabled = false;
        if !is_send_enabled(&text) {
            self.emit_compose();
            return;
        }
        let message = ChatMessage::text(text, self.state.auth.display_name());
        self.publish(message);
        self.emit_compose();
    }

    /// Fire-and-forget append to the feed.
    fn publish(&mut self, message: ChatMessage) {
        let path = self.config.messages_path();
        if let Err(e) = self.backends.feed.publish(path, message) {
            tracing::warn!(%e, "feed: publish failed");
            self.toast("Message not sent");
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it can contain message text.
                tracing::info!(action = action.tag(), "dispatch");
                if self.is_destroyed() {
                    tracing::debug!(action = action.tag(), "dropping action after destroy");
                    return;
                }
                self.handle_action(action);
            }
            CoreMsg::Backend(event) => {
                if self.is_destroyed() {
                    tracing::debug!(event = event.tag(), "dropping backend event after destroy");
                    return;
                }
                self.handle_backend(event);
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::ToastAutoDismiss { token } => self.handle_toast_auto_dismiss(token),
        }
    }

    fn handle_backend(&mut self, event: BackendEvent) {
        match event {
            BackendEvent::AuthStateChanged { user } => self.handle_auth_state_changed(user),
            BackendEvent::SignInFinished { outcome } => self.handle_sign_in_finished(outcome),
            BackendEvent::Feed {
                subscription_id,
                event,
            } => self.handle_feed_event(subscription_id, event),
            BackendEvent::UploadSucceeded {
                request_id,
                download_url,
            } => self.handle_upload_succeeded(request_id, download_url),
            BackendEvent::UploadFailed { request_id, reason } => {
                self.handle_upload_failed(request_id, reason)
            }
            BackendEvent::ConfigFetched { values } => self.handle_config_fetched(values),
            BackendEvent::ConfigFetchFailed { reason } => self.handle_config_fetch_failed(reason),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Lifecycle
            AppAction::Resumed => self.on_resumed(),
            AppAction::Paused => self.on_paused(),
            AppAction::Destroyed => self.on_destroyed(),

            // Compose
            AppAction::UpdateCompose { text } => self.update_compose(text),
            AppAction::SendMessage => self.send_message(),

            // Photo attach
            AppAction::PickPhoto => self.pick_photo(),
            AppAction::PhotoPicked { source_uri } => self.start_photo_upload(source_uri),

            // Menu
            AppAction::SignOut => self.sign_out(),
            AppAction::DeleteAccount => self.delete_account(),

            // UI
            AppAction::ClearToast => {
                if self.state.toast.take().is_some() {
                    self.emit_toast();
                }
            }
        }
    }
}
