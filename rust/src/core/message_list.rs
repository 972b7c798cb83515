use crate::state::ChatMessage;

/// Messages in the order the feed delivered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct MessageList {
    messages: Vec<ChatMessage>,
}

impl MessageList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Removes the first message equal to `message`. Returns false if none matched.
    pub(crate) fn remove(&mut self, message: &ChatMessage) -> bool {
        match self.messages.iter().position(|m| m == message) {
            Some(idx) => {
                self.messages.remove(idx);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub(crate) fn as_slice(&self) -> &[ChatMessage] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> ChatMessage {
        ChatMessage::text(text, "alice")
    }

    #[test]
    fn appends_keep_arrival_order() {
        let mut list = MessageList::new();
        let arrivals = vec![msg("c"), msg("a"), msg("b"), msg("a")];
        for m in arrivals.iter().cloned() {
            list.append(m);
        }
        assert_eq!(list.as_slice(), arrivals.as_slice());
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_takes_first_matching_value_only() {
        let mut list = MessageList::new();
        list.append(msg("a"));
        list.append(msg("b"));
        list.append(msg("a"));

        assert!(list.remove(&msg("a")));
        assert_eq!(list.as_slice(), &[msg("b"), msg("a")]);
    }

    #[test]
    fn removing_absent_value_is_a_noop() {
        let mut list = MessageList::new();
        list.append(msg("a"));

        assert!(!list.remove(&msg("zzz")));
        // Same text from a different sender is a different value.
        assert!(!list.remove(&ChatMessage::text("a", "bob")));
        assert_eq!(list.as_slice(), &[msg("a")]);
    }

    #[test]
    fn clear_empties_but_keeps_list_usable() {
        let mut list = MessageList::new();
        list.append(msg("a"));
        list.append(ChatMessage::photo("https://store/x.jpg", "alice"));
        list.clear();
        assert!(list.is_empty());

        list.append(msg("b"));
        assert_eq!(list.as_slice(), &[msg("b")]);
    }
}
