// Auth-driven session lifecycle + feed subscription side effects.

use super::*;

impl AppCore {
    pub(super) fn attach_auth_listener(&mut self) {
        if self.auth_listener_registered {
            return;
        }
        self.auth_listener_registered = true;
        self.backends.auth.add_state_listener();
    }

    pub(super) fn detach_auth_listener(&mut self) {
        if !self.auth_listener_registered {
            return;
        }
        self.auth_listener_registered = false;
        self.backends.auth.remove_state_listener();
    }

    pub(super) fn handle_auth_state_changed(&mut self, user: Option<AuthUser>) {
        if !self.auth_listener_registered {
            // The view is in the background; the next resume re-registers and gets a fresh state.
            tracing::debug!("auth: dropping state change while listener is detached");
            return;
        }
        match user {
            Some(user) => self.on_signed_in(user.display_name),
            None => self.on_signed_out(),
        }
    }

    fn on_signed_in(&mut self, display_name: Option<String>) {
        let display_name = display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string());
        tracing::info!(name = %display_name, "auth: signed in");
        self.state.auth = AuthState::SignedIn { display_name };
        self.attach_feed();
        self.emit_auth();
    }

    fn on_signed_out(&mut self) {
        tracing::info!(cleared = self.messages.len(), "auth: signed out");
        self.state.auth = AuthState::SignedOut;
        self.messages.clear();
        self.detach_feed();
        self.launch_sign_in();
        self.emit_auth();
    }

    fn launch_sign_in(&mut self) {
        if self.state.busy.signing_in || self.state.finished {
            return;
        }
        self.state.busy.signing_in = true;
        let rev = self.next_rev();
        let _ = self.update_sender.send(AppUpdate::LaunchSignIn {
            rev,
            providers: SIGN_IN_PROVIDERS.to_vec(),
        });
    }

    pub(super) fn handle_sign_in_finished(&mut self, outcome: SignInOutcome) {
        tracing::info!(?outcome, "auth: sign-in flow finished");
        self.set_busy(|b| b.signing_in = false);
        match outcome {
            SignInOutcome::Ok => self.toast("You are now signed in. Welcome to FriendlyChat!"),
            SignInOutcome::Cancelled => {
                self.toast("Sign in canceled");
                self.finish();
            }
            // Keep the view; the next signed-out notification relaunches the flow.
            SignInOutcome::NoNetwork => self.toast("Check your internet connection"),
        }
    }

    pub(super) fn sign_out(&mut self) {
        self.backends.auth.sign_out();
    }

    pub(super) fn delete_account(&mut self) {
        self.backends.auth.delete_account();
    }

    /// No-op while a subscription is live.
    pub(super) fn attach_feed(&mut self) {
        if self.feed_subscription.is_some() {
            return;
        }
        self.feed_subscription_seq = self.feed_subscription_seq.wrapping_add(1);
        let id = self.feed_subscription_seq;
        self.feed_subscription = Some(id);
        tracing::info!(subscription_id = id, "feed: attached");
        self.backends
            .feed
            .subscribe(self.config.messages_path(), id);
    }

    /// No-op while detached.
    pub(super) fn detach_feed(&mut self) {
        if let Some(id) = self.feed_subscription.take() {
            tracing::info!(subscription_id = id, "feed: detached");
            self.backends.feed.unsubscribe(id);
        }
    }

    pub(super) fn handle_feed_event(&mut self, subscription_id: u64, event: FeedEvent) {
        if self.feed_subscription != Some(subscription_id) {
            tracing::debug!(
                subscription_id,
                event = event.tag(),
                "feed: dropping event for stale subscription"
            );
            return;
        }
        match event {
            FeedEvent::Added { message } => {
                if !message.is_well_formed() {
                    tracing::warn!(sender = %message.name, "feed: dropping malformed message");
                    return;
                }
                self.messages.append(message);
                self.emit_messages();
            }
            FeedEvent::Removed { message } => {
                if self.messages.remove(&message) {
                    self.emit_messages();
                }
            }
            // Messages are immutable and ordered by arrival.
            FeedEvent::Changed { .. } | FeedEvent::Moved { .. } => {}
            FeedEvent::Cancelled { reason } => {
                // The store has already dropped the listener. A later attach replays every
                // existing child, so the model must start empty again.
                tracing::warn!(subscription_id, %reason, "feed: subscription cancelled");
                self.feed_subscription = None;
                self.messages.clear();
                self.toast("Messages are unavailable right now");
            }
        }
    }
}
