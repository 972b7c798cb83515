// Remote-configured compose limits.

use std::collections::HashMap;

use crate::state::{RemoteConfigSnapshot, DEFAULT_MSG_LENGTH_LIMIT};

pub(crate) const MESSAGE_LENGTH_KEY: &str = "message_length";
pub(crate) const CACHE_EXPIRATION_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub(crate) struct ConfigGate {
    developer_mode: bool,
    defaults: HashMap<String, String>,
    active: HashMap<String, String>,
    fetched: Option<HashMap<String, String>>,
}

impl ConfigGate {
    pub(crate) fn new(developer_mode: bool) -> Self {
        let mut gate = Self {
            developer_mode,
            defaults: HashMap::new(),
            active: HashMap::new(),
            fetched: None,
        };
        gate.set_defaults(HashMap::from([(
            MESSAGE_LENGTH_KEY.to_string(),
            DEFAULT_MSG_LENGTH_LIMIT.to_string(),
        )]));
        gate
    }

    pub(crate) fn set_defaults(&mut self, defaults: HashMap<String, String>) {
        self.defaults = defaults;
    }

    /// Developer mode always refetches.
    pub(crate) fn cache_expiration_secs(&self) -> u64 {
        if self.developer_mode {
            0
        } else {
            CACHE_EXPIRATION_SECS
        }
    }

    pub(crate) fn on_fetched(&mut self, values: HashMap<String, String>) {
        self.fetched = Some(values);
    }

    /// Promote the last fetched values to active. Returns false if nothing was pending.
    pub(crate) fn activate_fetched(&mut self) -> bool {
        match self.fetched.take() {
            Some(values) => {
                self.active = values;
                true
            }
            None => false,
        }
    }

    /// Active value, then default, then 0.
    pub(crate) fn get_long(&self, key: &str) -> i64 {
        self.active
            .get(key)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .or_else(|| {
                self.defaults
                    .get(key)
                    .and_then(|v| v.trim().parse::<i64>().ok())
            })
            .unwrap_or(0)
    }

    pub(crate) fn message_length_limit(&self) -> u32 {
        match u32::try_from(self.get_long(MESSAGE_LENGTH_KEY)) {
            Ok(limit) if limit > 0 => limit,
            _ => DEFAULT_MSG_LENGTH_LIMIT,
        }
    }

    pub(crate) fn snapshot(&self) -> RemoteConfigSnapshot {
        RemoteConfigSnapshot {
            message_length_limit: self.message_length_limit(),
            cache_expiry_seconds: self.cache_expiration_secs(),
        }
    }
}

/// Keeps the longest prefix that fits in `limit` UTF-16 code units, the unit text fields
/// on the platform measure length in. A character that would straddle the limit is dropped
/// whole.
pub(crate) fn apply_length_filter(text: &str, limit: u32) -> String {
    let mut budget = limit as usize;
    text.chars()
        .take_while(|c| match budget.checked_sub(c.len_utf16()) {
            Some(rest) => {
                budget = rest;
                true
            }
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(limit: &str) -> HashMap<String, String> {
        HashMap::from([(MESSAGE_LENGTH_KEY.to_string(), limit.to_string())])
    }

    #[test]
    fn cache_expiration_depends_on_developer_mode() {
        assert_eq!(ConfigGate::new(false).cache_expiration_secs(), 3600);
        assert_eq!(ConfigGate::new(true).cache_expiration_secs(), 0);
    }

    #[test]
    fn default_limit_applies_before_any_fetch() {
        let gate = ConfigGate::new(false);
        assert_eq!(gate.message_length_limit(), 1000);
        assert_eq!(gate.get_long(MESSAGE_LENGTH_KEY), 1000);
        assert_eq!(gate.get_long("unknown"), 0);
    }

    #[test]
    fn fetched_values_take_effect_only_after_activation() {
        let mut gate = ConfigGate::new(false);
        gate.on_fetched(values("140"));
        assert_eq!(gate.message_length_limit(), 1000);

        assert!(gate.activate_fetched());
        assert_eq!(gate.message_length_limit(), 140);
        assert!(!gate.activate_fetched(), "nothing left to activate");
    }

    #[test]
    fn failed_fetch_keeps_default_limit() {
        let mut gate = ConfigGate::new(true);
        assert!(!gate.activate_fetched());
        assert_eq!(
            gate.snapshot(),
            RemoteConfigSnapshot {
                message_length_limit: 1000,
                cache_expiry_seconds: 0,
            }
        );
    }

    #[test]
    fn unusable_remote_limits_fall_back_to_default() {
        for bad in ["not-a-number", "0", "-5", "99999999999"] {
            let mut gate = ConfigGate::new(false);
            gate.on_fetched(values(bad));
            gate.activate_fetched();
            assert_eq!(gate.message_length_limit(), 1000, "value {bad:?}");
        }
    }

    #[test]
    fn length_filter_counts_utf16_units() {
        assert_eq!(apply_length_filter("hello", 3), "hel");
        assert_eq!(apply_length_filter("hi", 10), "hi");
        assert_eq!(apply_length_filter("héllo", 2), "hé");

        // Astral characters take two units and are never split.
        assert_eq!(apply_length_filter("😀😀", 3), "😀");
        assert_eq!(apply_length_filter("a😀", 2), "a");
        assert_eq!(apply_length_filter("😀b", 3), "😀b");

        let long = "x".repeat(1500);
        assert_eq!(apply_length_filter(&long, 1000).chars().count(), 1000);
    }
}
