use flume::Sender;

use crate::backend::{BackendEvent, IdentityProvider};
use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ImagePickerRequest {
    pub mime_type: String,
    pub local_only: bool,
    pub chooser_title: String,
}

#[derive(uniffi::Enum, Clone, Debug)]
#[allow(clippy::large_enum_variant)] // uniffi enums cannot use Box<T> indirection
pub enum AppUpdate {
    /// Primary update stream: always send a full state snapshot.
    FullState(AppState),
    /// Side effects the platform has to perform; they do not change the snapshot.
    LaunchSignIn {
        rev: u64,
        providers: Vec<IdentityProvider>,
    },
    LaunchImagePicker {
        rev: u64,
        request: ImagePickerRequest,
    },
    Finish {
        rev: u64,
    },
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
            AppUpdate::LaunchSignIn { rev, .. }
            | AppUpdate::LaunchImagePicker { rev, .. }
            | AppUpdate::Finish { rev } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Backend(BackendEvent),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    ToastAutoDismiss { token: u64 },
}

/// Cloneable handle for feeding backend callbacks into the core from any thread.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Sender<CoreMsg>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<CoreMsg>) -> Self {
        Self { tx }
    }

    /// Never blocks. Events sent after the core has shut down are dropped.
    pub fn send(&self, event: BackendEvent) {
        let _ = self.tx.send(CoreMsg::Backend(event));
    }
}
