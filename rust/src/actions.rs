#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    // Lifecycle
    Resumed,
    Paused,
    Destroyed,

    // Compose
    UpdateCompose { text: String },
    SendMessage,

    // Photo attach
    PickPhoto,
    PhotoPicked { source_uri: String },

    // Menu
    SignOut,
    DeleteAccount,

    // UI
    ClearToast,
}

impl AppAction {
    /// Log-safe action tag (never includes message text).
    pub fn tag(&self) -> &'static str {
        match self {
            // Lifecycle
            AppAction::Resumed => "Resumed",
            AppAction::Paused => "Paused",
            AppAction::Destroyed => "Destroyed",

            // Compose
            AppAction::UpdateCompose { .. } => "UpdateCompose",
            AppAction::SendMessage => "SendMessage",

            // Photo attach
            AppAction::PickPhoto => "PickPhoto",
            AppAction::PhotoPicked { .. } => "PhotoPicked",

            // Menu
            AppAction::SignOut => "SignOut",
            AppAction::DeleteAccount => "DeleteAccount",

            // UI
            AppAction::ClearToast => "ClearToast",
        }
    }
}
