/// Display name used whenever nobody is signed in.
pub const ANONYMOUS: &str = "anonymous";

/// Default cap on compose length until remote config says otherwise.
pub const DEFAULT_MSG_LENGTH_LIMIT: u32 = 1000;

/// A chat message as stored in the feed. Either `text` or `photo_url` is set, never both.
///
/// The platform store maps these fields onto its own records (`text`, `name`, `photoUrl`).
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub text: Option<String>,
    pub name: String,
    pub photo_url: Option<String>,
}

impl ChatMessage {
    pub fn text(text: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            name: sender.into(),
            photo_url: None,
        }
    }

    pub fn photo(url: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            text: None,
            name: sender.into(),
            photo_url: Some(url.into()),
        }
    }

    /// True when exactly one of text/photo is present.
    pub fn is_well_formed(&self) -> bool {
        self.text.is_some() != self.photo_url.is_some()
    }

    pub fn is_photo(&self) -> bool {
        self.photo_url.is_some()
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn { display_name: String },
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, AuthState::SignedIn { .. })
    }

    pub fn display_name(&self) -> &str {
        match self {
            AuthState::SignedOut => ANONYMOUS,
            AuthState::SignedIn { display_name } => display_name,
        }
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Resumed,
    Paused,
    Destroyed,
}

impl LifecycleState {
    /// `Created -> Resumed <-> Paused`, and anything may go to `Destroyed` once.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Destroyed, _) => false,
            (_, Destroyed) => true,
            (Created, Resumed) | (Resumed, Paused) | (Paused, Resumed) => true,
            _ => false,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ComposeState {
    pub text: String,
    pub send_enabled: bool,
    pub length_limit: u32,
}

impl ComposeState {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            send_enabled: false,
            length_limit: DEFAULT_MSG_LENGTH_LIMIT,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfigSnapshot {
    pub message_length_limit: u32,
    pub cache_expiry_seconds: u64,
}

#[derive(uniffi::Record, Clone, Debug, Default, PartialEq, Eq)]
pub struct BusyState {
    pub signing_in: bool,
    pub uploading_photo: bool,
}

impl BusyState {
    pub fn idle() -> Self {
        Self::default()
    }
}

#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub lifecycle: LifecycleState,
    pub auth: AuthState,
    pub messages: Vec<ChatMessage>,
    pub feed_attached: bool,
    pub compose: ComposeState,
    pub config: RemoteConfigSnapshot,
    pub busy: BusyState,
    pub toast: Option<String>,
    /// Set once the view has been asked to close itself.
    pub finished: bool,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            lifecycle: LifecycleState::Created,
            auth: AuthState::SignedOut,
            messages: vec![],
            feed_attached: false,
            compose: ComposeState::empty(),
            config: RemoteConfigSnapshot {
                message_length_limit: DEFAULT_MSG_LENGTH_LIMIT,
                cache_expiry_seconds: 0,
            },
            busy: BusyState::idle(),
            toast: None,
            finished: false,
        }
    }
}
