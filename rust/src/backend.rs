// Platform-side services the core talks to. The mobile shell implements these on top of its
// vendor SDKs; results come back asynchronously as `BackendEvent`s via `FfiApp::deliver`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::state::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, uniffi::Error)]
pub enum BackendError {
    #[error("backend unavailable: {reason}")]
    Unavailable { reason: String },
    #[error("backend rejected request: {reason}")]
    Rejected { reason: String },
    #[error("unexpected callback failure: {reason}")]
    Callback { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for BackendError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Callback { reason: e.reason }
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityProvider {
    Email,
    Google,
}

/// Providers offered by the sign-in flow.
pub const SIGN_IN_PROVIDERS: [IdentityProvider; 2] =
    [IdentityProvider::Email, IdentityProvider::Google];

#[uniffi::export(callback_interface)]
pub trait AuthProvider: Send + Sync + 'static {
    /// Start delivering `BackendEvent::AuthStateChanged`. Providers typically fire once with
    /// the current user right away.
    fn add_state_listener(&self);
    fn remove_state_listener(&self);
    fn sign_out(&self);
    fn delete_account(&self);
}

#[uniffi::export(callback_interface)]
pub trait FeedStore: Send + Sync + 'static {
    /// Append a message under `path`. Must not wait for the store to acknowledge.
    fn publish(&self, path: String, message: ChatMessage) -> Result<(), BackendError>;
    /// Stream child events under `path`, tagged with `subscription_id`.
    fn subscribe(&self, path: String, subscription_id: u64);
    fn unsubscribe(&self, subscription_id: u64);
}

#[uniffi::export(callback_interface)]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Upload `source_uri` to `destination_path`; completion arrives as
    /// `UploadSucceeded`/`UploadFailed` carrying `request_id`.
    fn upload(&self, request_id: u64, source_uri: String, destination_path: String);
}

#[uniffi::export(callback_interface)]
pub trait RemoteConfigService: Send + Sync + 'static {
    /// Fetch remote values, using cached ones younger than `cache_expiration_seconds`.
    fn fetch(&self, cache_expiration_seconds: u64);
}

/// The four platform services, shared with the core actor.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthProvider>,
    pub feed: Arc<dyn FeedStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub remote_config: Arc<dyn RemoteConfigService>,
}

impl Backends {
    /// One object serving every interface (in-memory backends, test doubles).
    pub fn shared<T>(backend: Arc<T>) -> Self
    where
        T: AuthProvider + FeedStore + ObjectStorage + RemoteConfigService,
    {
        Self {
            auth: backend.clone(),
            feed: backend.clone(),
            storage: backend.clone(),
            remote_config: backend,
        }
    }
}

#[derive(uniffi::Record, Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub display_name: Option<String>,
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    Ok,
    Cancelled,
    NoNetwork,
}

#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    Added { message: ChatMessage },
    Changed { message: ChatMessage },
    Removed { message: ChatMessage },
    Moved { message: ChatMessage },
    Cancelled { reason: String },
}

impl FeedEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            FeedEvent::Added { .. } => "Added",
            FeedEvent::Changed { .. } => "Changed",
            FeedEvent::Removed { .. } => "Removed",
            FeedEvent::Moved { .. } => "Moved",
            FeedEvent::Cancelled { .. } => "Cancelled",
        }
    }
}

#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    AuthStateChanged {
        user: Option<AuthUser>,
    },
    SignInFinished {
        outcome: SignInOutcome,
    },
    Feed {
        subscription_id: u64,
        event: FeedEvent,
    },
    UploadSucceeded {
        request_id: u64,
        download_url: String,
    },
    UploadFailed {
        request_id: u64,
        reason: String,
    },
    ConfigFetched {
        values: HashMap<String, String>,
    },
    ConfigFetchFailed {
        reason: String,
    },
}

impl BackendEvent {
    pub fn tag(&self) -> &'static str {
        match self {
            BackendEvent::AuthStateChanged { .. } => "AuthStateChanged",
            BackendEvent::SignInFinished { .. } => "SignInFinished",
            BackendEvent::Feed { .. } => "Feed",
            BackendEvent::UploadSucceeded { .. } => "UploadSucceeded",
            BackendEvent::UploadFailed { .. } => "UploadFailed",
            BackendEvent::ConfigFetched { .. } => "ConfigFetched",
            BackendEvent::ConfigFetchFailed { .. } => "ConfigFetchFailed",
        }
    }
}
