use crate::llm::ChatMessage;

/// Rolling in-memory history sent with every model call.
///
/// Pushes never drop anything; [`ConversationWindow::trim`] runs once a turn
/// is over and, past `max_entries`, keeps only the most recent `keep_entries`.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    entries: Vec<ChatMessage>,
    max_entries: usize,
    keep_entries: usize,
}

impl ConversationWindow {
    pub fn new(max_entries: usize, keep_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: Vec::new(),
            max_entries,
            keep_entries: keep_entries.clamp(1, max_entries),
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    pub fn trim(&mut self) {
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.keep_entries;
            self.entries.drain(..excess);
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
