// Push notification entry point. Payloads are only logged; nothing is shown to the user.

use std::collections::{BTreeMap, HashMap};

#[derive(uniffi::Record, Debug, Clone, Default, PartialEq, Eq)]
pub struct PushPayload {
    pub data: HashMap<String, String>,
    pub notification_body: Option<String>,
}

#[uniffi::export]
pub fn handle_push_message(payload: PushPayload) {
    for line in push_log_lines(&payload) {
        tracing::debug!(target: "friendlychat::push", "{line}");
    }
}

fn push_log_lines(payload: &PushPayload) -> Vec<String> {
    let mut lines = Vec::new();
    if !payload.data.is_empty() {
        // Sorted so log output is stable.
        let data: BTreeMap<&String, &String> = payload.data.iter().collect();
        lines.push(format!("data payload: {data:?}"));
    }
    if let Some(body) = payload.notification_body.as_deref() {
        lines.push(format!("notification body: {body}"));
    }
    lines
}
