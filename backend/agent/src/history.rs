//! Conversation history and its bounded-window truncation.
//!
//! A message's ordinal position is its index in [`ConversationHistory::messages`].

use opencli_core::{ChatMessage, Role};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history whose first message is the given system prompt.
    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(prompt)],
        }
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Append a message; absent content is stored as empty text.
    pub fn append(&mut self, role: Role, content: Option<&str>) {
        self.messages
            .push(ChatMessage::new(role, content.unwrap_or_default()));
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// A new history holding the system message (if any) plus the most recent
    /// `target_count` non-system messages, in their original order.
    ///
    /// Tool results whose assistant request fell outside the window are
    /// dropped from its front, so the result never opens with an orphaned
    /// tool message. Applying the same `target_count` twice changes nothing.
    pub fn truncate(&self, target_count: usize) -> ConversationHistory {
        let system = self.messages.iter().find(|m| m.is_system()).cloned();

        let rest: Vec<&ChatMessage> = self.messages.iter().filter(|m| !m.is_system()).collect();
        let start = rest.len().saturating_sub(target_count);
        let window = rest[start..]
            .iter()
            .skip_while(|m| m.role == Role::Tool)
            .map(|m| (*m).clone());

        ConversationHistory {
            messages: system.into_iter().chain(window).collect(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
