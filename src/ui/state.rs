//! Application state management
//!
//! The UI never owns session state. It keeps a mirror of the live
//! conversation and the archived interviews, rebuilt from controller events,
//! and turns user actions into controller commands.

use crate::integration::{ControllerEvent, ControllerHandle};
use crate::messages::{Conversation, Message};
use crate::Result;
use tracing::{debug, warn};

/// Notice shown when a typed message is refused during a pending reply
pub const WAIT_FOR_REPLY: &str = "Please wait for the current reply.";

/// Central application state
pub struct AppState {
    handle: Option<ControllerHandle>,

    /// Messages of the live conversation, in order
    pub messages: Vec<Message>,

    /// Id of the live conversation
    pub conversation_id: u64,

    /// Archived interviews, oldest first
    pub history: Vec<Conversation>,

    /// Archived interview being viewed instead of the live one
    pub selected_history: Option<u64>,

    /// Current text input
    pub input_text: String,

    pub listening: bool,
    pub reply_pending: bool,
    pub speaking: bool,

    pub voice_input_available: bool,
    pub voice_output_available: bool,

    /// Short notice shown above the input bar
    pub notice: Option<String>,

    /// The controller has stopped
    pub shut_down: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// State without a controller; commands are dropped with a warning
    pub fn new() -> Self {
        Self {
            handle: None,
            messages: Vec::new(),
            conversation_id: 1,
            history: Vec::new(),
            selected_history: None,
            input_text: String::new(),
            listening: false,
            reply_pending: false,
            speaking: false,
            voice_input_available: false,
            voice_output_available: false,
            notice: None,
            shut_down: false,
        }
    }

    pub fn with_handle(handle: ControllerHandle) -> Self {
        Self {
            handle: Some(handle),
            ..Self::new()
        }
    }

    /// Whether something is running that the Stop button can interrupt
    pub fn is_busy(&self) -> bool {
        self.listening || self.reply_pending || self.speaking
    }

    pub fn is_viewing_history(&self) -> bool {
        self.selected_history.is_some()
    }

    /// Messages to display: the selected archive or the live conversation
    pub fn displayed_messages(&self) -> &[Message] {
        self.selected_history
            .and_then(|id| self.history.iter().find(|c| c.id == id))
            .map(|c| c.messages.as_slice())
            .unwrap_or(&self.messages)
    }

    /// Drain controller events into the mirror
    pub fn poll_events(&mut self) {
        let events: Vec<ControllerEvent> = match &self.handle {
            Some(handle) => std::iter::from_fn(|| handle.try_recv_event()).collect(),
            None => return,
        };

        for event in events {
            self.apply_event(event);
        }
    }

    /// Apply one controller event
    pub fn apply_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Capabilities {
                voice_input,
                voice_output,
            } => {
                self.voice_input_available = voice_input;
                self.voice_output_available = voice_output;
            }
            ControllerEvent::MessageAppended(message) => {
                if !message.is_system() {
                    self.notice = None;
                }
                self.messages.push(message);
            }
            ControllerEvent::SystemMessagesCleared => {
                self.messages.retain(|m| !m.is_system());
            }
            ControllerEvent::ListeningChanged(listening) => self.listening = listening,
            ControllerEvent::ReplyPending(pending) => self.reply_pending = pending,
            ControllerEvent::SpeakingChanged(speaking) => self.speaking = speaking,
            ControllerEvent::SubmitRejected(text) => {
                if self.input_text.is_empty() {
                    self.input_text = text;
                }
                self.notice = Some(WAIT_FOR_REPLY.to_string());
            }
            ControllerEvent::InterviewArchived(conversation) => {
                debug!("Interview {} added to history", conversation.id);
                self.history.push(conversation);
            }
            ControllerEvent::ConversationReset { id } => {
                self.messages.clear();
                self.conversation_id = id;
                self.selected_history = None;
                self.listening = false;
                self.reply_pending = false;
                self.speaking = false;
                self.notice = None;
            }
            ControllerEvent::Shutdown => self.shut_down = true,
        }
    }

    /// Send the typed message
    pub fn send_message(&mut self) {
        let text = self.input_text.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.reply_pending {
            self.notice = Some(WAIT_FOR_REPLY.to_string());
            return;
        }

        // Back to the live conversation before sending into it
        self.selected_history = None;
        if self.command(|handle| handle.submit(text)) {
            self.input_text.clear();
        }
    }

    pub fn start_listening(&mut self) {
        self.selected_history = None;
        self.command(ControllerHandle::start_listening);
    }

    pub fn stop(&mut self) {
        self.command(ControllerHandle::stop);
    }

    /// End the current interview and start a new one
    pub fn new_interview(&mut self) {
        self.command(ControllerHandle::end_interview);
    }

    pub fn shutdown(&mut self) {
        self.command(ControllerHandle::shutdown);
    }

    /// Toggle viewing an archived interview
    pub fn select_history(&mut self, id: Option<u64>) {
        self.selected_history = id.filter(|id| self.history.iter().any(|c| c.id == *id));
    }

    fn command(&mut self, send: impl FnOnce(&ControllerHandle) -> Result<()>) -> bool {
        let Some(handle) = &self.handle else {
            warn!("No controller attached, command dropped");
            return false;
        };

        match send(handle) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to reach controller: {}", e);
                self.notice = Some(e.user_message());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_follows_events() {
        let mut state = AppState::new();
        state.apply_event(ControllerEvent::MessageAppended(Message::system("Listening...")));
        state.apply_event(ControllerEvent::SystemMessagesCleared);
        state.apply_event(ControllerEvent::MessageAppended(Message::user("Hi")));
        state.apply_event(ControllerEvent::ReplyPending(true));

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].text, "Hi");
        assert!(state.is_busy());

        state.apply_event(ControllerEvent::ConversationReset { id: 2 });
        assert!(state.messages.is_empty());
        assert_eq!(state.conversation_id, 2);
        assert!(!state.is_busy());
    }

    #[test]
    fn test_rejected_submit_restores_input() {
        let mut state = AppState::new();
        state.apply_event(ControllerEvent::SubmitRejected("second question".into()));

        assert_eq!(state.input_text, "second question");
        assert_eq!(state.notice.as_deref(), Some(WAIT_FOR_REPLY));
    }

    #[test]
    fn test_select_history() {
        let mut state = AppState::new();
        let mut archived = Conversation::new(1);
        archived.push(Message::user("old question"));
        state.apply_event(ControllerEvent::InterviewArchived(archived));
        state.messages.push(Message::user("live question"));

        state.select_history(Some(1));
        assert_eq!(state.displayed_messages()[0].text, "old question");

        state.select_history(Some(42));
        assert_eq!(state.displayed_messages()[0].text, "live question");
    }

    #[test]
    fn test_send_without_controller_keeps_input() {
        let mut state = AppState::new();
        state.input_text = "hello".into();
        state.send_message();
        assert_eq!(state.input_text, "hello");
    }
}
