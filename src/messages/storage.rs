use super::types::{Message, Sender};
use serde::{Deserialize, Serialize};

const TITLE_MAX_CHARS: usize = 40;

/// One interview transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Drop transient system messages, returning how many were removed.
    pub fn clear_system_messages(&mut self) -> usize {
        let before = self.messages.len();
        self.messages.retain(|m| !m.is_system());
        before - self.messages.len()
    }

    pub fn has_user_messages(&self) -> bool {
        self.messages.iter().any(|m| m.sender == Sender::User)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sidebar title: the first user message, shortened.
    pub fn title(&self) -> String {
        let first = self
            .messages
            .iter()
            .find(|m| m.sender == Sender::User)
            .map(|m| m.text.trim())
            .unwrap_or("");

        if first.is_empty() {
            return format!("Interview {}", self.id);
        }

        if first.chars().count() > TITLE_MAX_CHARS {
            let short: String = first.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}...", short.trim_end())
        } else {
            first.to_string()
        }
    }
}

/// Archived interviews for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct InterviewHistory {
    interviews: Vec<Conversation>,
    next_id: u64,
}

impl InterviewHistory {
    pub fn new() -> Self {
        Self {
            interviews: Vec::new(),
            next_id: 1,
        }
    }

    /// Fresh live conversation carrying the next unused id.
    pub fn start_conversation(&self) -> Conversation {
        Conversation::new(self.next_id)
    }

    /// Archive a finished conversation.
    ///
    /// Conversations without a user message are not archived and `None` is
    /// returned; their id stays available for the next live conversation.
    pub fn archive(&mut self, mut conversation: Conversation) -> Option<&Conversation> {
        if !conversation.has_user_messages() {
            return None;
        }

        conversation.clear_system_messages();
        self.next_id = self.next_id.max(conversation.id + 1);
        self.interviews.push(conversation);
        self.interviews.last()
    }

    pub fn get(&self, id: u64) -> Option<&Conversation> {
        self.interviews.iter().find(|c| c.id == id)
    }

    /// Archived interviews, oldest first.
    pub fn all(&self) -> &[Conversation] {
        &self.interviews
    }

    pub fn len(&self) -> usize {
        self.interviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interviews.is_empty()
    }
}

impl Default for InterviewHistory {
    fn default() -> Self {
        Self::new()
    }
}
