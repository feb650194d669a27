//! Live conversation state for one session id.

use chrono::{DateTime, Utc};
use ember_core::{ChatMessage, Role};

/// The complete in-memory state of one conversation.
///
/// The message sequence is append-only and conversational order is
/// insertion order. The first message is always the single system prompt
/// (established at creation, repaired on reload).
#[derive(Debug, Clone)]
pub struct Session {
    /// Externally supplied opaque session id.
    pub id: String,
    /// Message history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Creation timestamp (earliest persisted row when reloaded).
    pub created_at: DateTime<Utc>,
    /// Updated only when a turn completes, never on lookup.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a message. Does not bump `last_activity`; only a completed
    /// turn counts as activity.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.push(ChatMessage::new(role, content));
    }

    /// Mark the session active now.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    #[must_use]
    pub fn has_system(&self) -> bool {
        self.messages.iter().any(|m| m.role == Role::System)
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
