//! Interaction controller for the interview assistant
//!
//! Owns every piece of session state and mediates between speech capture,
//! speech output and the chat endpoint. All state changes happen while
//! dispatching one input from a single queue: UI commands, network
//! completions and capture events all arrive there.
//!
//! Overlapping replies are resolved with the cancellation token. Every request
//! is tagged with the token current when it was issued; a completion whose
//! token is no longer current is dropped without being rendered or spoken.

use crate::client::ChatEndpoint;
use crate::config::SpeechConfig;
use crate::messages::{Conversation, InterviewHistory, Message};
use crate::speech::{
    select_voice, RecognitionEvent, RecognitionSink, SilentSpeaker, SpeechInput, SpeechOutput,
    Utterance, UtteranceSettings, Voice,
};
use crate::{Result, VoicebotError};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bot message shown for any failed request
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong.";

/// Transient status shown while capturing
pub const LISTENING: &str = "Listening...";

/// Notice shown when no speech capture is available
pub const VOICE_INPUT_UNAVAILABLE: &str =
    "Voice input is not available. Type your message instead.";

/// Notice shown when no speech output is available
pub const VOICE_OUTPUT_UNAVAILABLE: &str =
    "Speech output is not available. Replies will be shown as text only.";

/// How often the active utterance is checked for completion
const SPEECH_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Commands the UI can send to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerCommand {
    /// Typed message from the input bar
    Submit(String),

    /// Start one speech capture
    StartListening,

    /// Interrupt capture, the pending reply and speech output
    Stop,

    /// Archive the current interview and start a new one
    EndInterview,

    /// End the session and stop the controller
    Shutdown,
}

/// Everything that can wake the controller
#[derive(Debug)]
pub enum ControllerInput {
    Command(ControllerCommand),

    /// A chat request finished
    ReplyReady { token: u64, result: Result<String> },

    /// Speech capture reported something
    Recognition { capture: u64, event: RecognitionEvent },
}

/// Events emitted for the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Which speech capabilities are usable
    Capabilities { voice_input: bool, voice_output: bool },

    /// A message was added to the live conversation
    MessageAppended(Message),

    /// Transient system messages were removed from the live conversation
    SystemMessagesCleared,

    /// Capture started or ended
    ListeningChanged(bool),

    /// A reply is (no longer) awaited
    ReplyPending(bool),

    /// An utterance started or ended
    SpeakingChanged(bool),

    /// Typed input was refused because a reply is in flight
    SubmitRejected(String),

    /// An interview was moved to the history
    InterviewArchived(Conversation),

    /// A fresh live conversation was started
    ConversationReset { id: u64 },

    /// The controller has shut down
    Shutdown,
}

/// Mutable state of one session
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Live conversation
    pub conversation: Conversation,

    /// Cancellation token; bumped by every send and every stop
    pub token: u64,

    /// Whether a chat request is outstanding
    pub reply_in_flight: bool,

    /// Whether speech capture is running
    pub listening: bool,

    /// Generation of the current capture run
    pub capture: u64,

    /// Utterance currently playing
    pub active_utterance: Option<Uuid>,
}

impl SessionState {
    fn new(conversation: Conversation) -> Self {
        Self {
            conversation,
            token: 0,
            reply_in_flight: false,
            listening: false,
            capture: 0,
            active_utterance: None,
        }
    }
}

/// Handle for controlling the controller from the UI
#[derive(Clone)]
pub struct ControllerHandle {
    command_tx: UnboundedSender<ControllerInput>,
    event_rx: Receiver<ControllerEvent>,
}

impl ControllerHandle {
    /// Send a command to the controller
    pub fn send_command(&self, cmd: ControllerCommand) -> Result<()> {
        self.command_tx
            .send(ControllerInput::Command(cmd))
            .map_err(|e| VoicebotError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(ControllerCommand::Submit(text.into()))
    }

    pub fn start_listening(&self) -> Result<()> {
        self.send_command(ControllerCommand::StartListening)
    }

    pub fn stop(&self) -> Result<()> {
        self.send_command(ControllerCommand::Stop)
    }

    pub fn end_interview(&self) -> Result<()> {
        self.send_command(ControllerCommand::EndInterview)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send_command(ControllerCommand::Shutdown)
    }

    /// Try to receive an event from the controller
    pub fn try_recv_event(&self) -> Option<ControllerEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// Single owner of the session state
pub struct InteractionController {
    endpoint: Arc<dyn ChatEndpoint>,
    output: Box<dyn SpeechOutput>,
    input: Option<Box<dyn SpeechInput>>,
    voice_output: bool,
    voice: Option<Voice>,
    settings: UtteranceSettings,
    state: SessionState,
    history: InterviewHistory,
    pending: Option<JoinHandle<()>>,
    inbox_tx: UnboundedSender<ControllerInput>,
    inbox_rx: UnboundedReceiver<ControllerInput>,
    event_tx: Sender<ControllerEvent>,
}

impl InteractionController {
    /// Create a controller; a missing capability means text-only for that side
    pub fn new(
        config: &SpeechConfig,
        endpoint: Arc<dyn ChatEndpoint>,
        output: Option<Box<dyn SpeechOutput>>,
        input: Option<Box<dyn SpeechInput>>,
    ) -> (Self, ControllerHandle) {
        let (inbox_tx, inbox_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let voice_output = output.is_some();
        let output = output.unwrap_or_else(|| Box::new(SilentSpeaker) as Box<dyn SpeechOutput>);
        let voice = select_voice(&output.voices(), config.preferred_voice.as_deref());
        if let Some(voice) = &voice {
            debug!("Speaking with voice {} ({})", voice.name, voice.lang);
        }

        let history = InterviewHistory::new();
        let state = SessionState::new(history.start_conversation());

        let handle = ControllerHandle {
            command_tx: inbox_tx.clone(),
            event_rx,
        };

        let mut controller = Self {
            endpoint,
            output,
            input,
            voice_output,
            voice,
            settings: UtteranceSettings {
                rate: config.rate,
                pitch: config.pitch,
                volume: config.volume,
            },
            state,
            history,
            pending: None,
            inbox_tx,
            inbox_rx,
            event_tx,
        };

        controller.emit(ControllerEvent::Capabilities {
            voice_input: controller.input.is_some(),
            voice_output,
        });
        controller.push_capability_notices();

        (controller, handle)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &InterviewHistory {
        &self.history
    }

    /// Process inputs until shutdown, polling speech completion in between
    pub async fn run(mut self) {
        info!("Interaction controller started");

        let mut ticker = tokio::time::interval(SPEECH_POLL_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                input = self.inbox_rx.recv() => match input {
                    Some(input) => {
                        if !self.dispatch(input) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = ticker.tick() => self.poll_speech(),
            }
        }

        info!("Interaction controller stopped");
    }

    /// Wait for the next input and dispatch it; false once shut down
    pub async fn step(&mut self) -> bool {
        match self.inbox_rx.recv().await {
            Some(input) => self.dispatch(input),
            None => false,
        }
    }

    /// Apply one input to the session; false once shut down
    pub fn dispatch(&mut self, input: ControllerInput) -> bool {
        match input {
            ControllerInput::Command(ControllerCommand::Submit(text)) => {
                self.submit(&text);
            }
            ControllerInput::Command(ControllerCommand::StartListening) => self.start_listening(),
            ControllerInput::Command(ControllerCommand::Stop) => self.stop(),
            ControllerInput::Command(ControllerCommand::EndInterview) => self.end_interview(true),
            ControllerInput::Command(ControllerCommand::Shutdown) => {
                info!("Controller shutdown requested");
                self.end_interview(false);
                self.emit(ControllerEvent::Shutdown);
                return false;
            }
            ControllerInput::ReplyReady { token, result } => self.on_reply(token, result),
            ControllerInput::Recognition { capture, event } => self.on_recognition(capture, event),
        }
        true
    }

    /// Handle typed input; returns whether it was accepted
    pub fn submit(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        if self.state.reply_in_flight {
            debug!("Submit rejected, reply already in flight");
            self.emit(ControllerEvent::SubmitRejected(text.to_string()));
            return false;
        }

        self.append_user_message(text);
        self.send_to_endpoint(text.to_string());
        true
    }

    /// Issue the chat request, superseding any request still in flight
    pub fn send_to_endpoint(&mut self, text: String) {
        self.state.token += 1;
        let token = self.state.token;

        if let Some(task) = self.pending.take() {
            task.abort();
            debug!("Aborted in-flight request, now at token {}", token);
        }
        self.set_reply_pending(true);

        let endpoint = Arc::clone(&self.endpoint);
        let inbox = self.inbox_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            let result = endpoint.send_message(&text).await;
            let _ = inbox.send(ControllerInput::ReplyReady { token, result });
        }));

        debug!("Chat request issued with token {}", token);
    }

    /// Interrupt everything: capture, pending reply and speech
    pub fn stop(&mut self) {
        self.state.token += 1;

        if let Some(task) = self.pending.take() {
            task.abort();
        }

        // Events from the aborted capture must not count
        self.state.capture += 1;
        if let Some(input) = self.input.as_mut() {
            input.abort();
        }

        self.output.cancel();
        if self.state.active_utterance.take().is_some() {
            self.emit(ControllerEvent::SpeakingChanged(false));
        }

        self.set_listening(false);
        self.set_reply_pending(false);
        info!("Interaction stopped at token {}", self.state.token);
    }

    /// Speak a reply, cutting off whatever is playing
    pub fn speak(&mut self, text: &str) {
        if !self.voice_output {
            return;
        }

        self.output.cancel();
        let was_speaking = self.state.active_utterance.take().is_some();

        let utterance = Utterance::new(text, self.voice.clone(), self.settings);
        match self.output.speak(&utterance) {
            Ok(()) => {
                self.state.active_utterance = Some(utterance.id);
                if !was_speaking {
                    self.emit(ControllerEvent::SpeakingChanged(true));
                }
            }
            Err(e) => {
                warn!("Failed to speak reply: {}", e);
                if was_speaking {
                    self.emit(ControllerEvent::SpeakingChanged(false));
                }
            }
        }
    }

    /// Start one capture run
    pub fn start_listening(&mut self) {
        if self.input.is_none() {
            self.push_system(VOICE_INPUT_UNAVAILABLE);
            return;
        }
        if self.state.listening {
            debug!("Already listening");
            return;
        }

        self.state.capture += 1;
        let capture = self.state.capture;
        let inbox = self.inbox_tx.clone();
        let sink: RecognitionSink = Box::new(move |event| {
            let _ = inbox.send(ControllerInput::Recognition { capture, event });
        });

        let started = match self.input.as_mut() {
            Some(input) => input.start(sink),
            None => return,
        };

        match started {
            Ok(()) => {
                self.set_listening(true);
                self.push_system(LISTENING);
            }
            Err(e) => {
                warn!("Failed to start capture: {}", e);
                self.push_system(format!("Error: {}", e));
            }
        }
    }

    /// Archive the live conversation and start a fresh one
    pub fn end_interview(&mut self, reset_server: bool) {
        self.stop();

        let finished = std::mem::replace(&mut self.state.conversation, Conversation::new(0));
        match self.history.archive(finished).cloned() {
            Some(archived) => {
                info!(
                    "Archived interview {} ({} messages)",
                    archived.id,
                    archived.len()
                );
                self.emit(ControllerEvent::InterviewArchived(archived));
            }
            None => debug!("Interview had no user messages, not archived"),
        }

        self.state.conversation = self.history.start_conversation();
        self.emit(ControllerEvent::ConversationReset {
            id: self.state.conversation.id,
        });
        self.push_capability_notices();

        if reset_server {
            let endpoint = Arc::clone(&self.endpoint);
            tokio::spawn(async move {
                if let Err(e) = endpoint.reset_session().await {
                    warn!("Failed to reset server session: {}", e);
                }
            });
        }
    }

    fn on_reply(&mut self, token: u64, result: Result<String>) {
        if token != self.state.token {
            debug!(
                "Discarding stale reply (token {}, current {})",
                token, self.state.token
            );
            return;
        }

        self.pending = None;
        self.set_reply_pending(false);

        match result {
            Ok(reply) => {
                self.push(Message::bot(reply.clone()));
                self.speak(&reply);
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                self.push(Message::bot(GENERIC_FAILURE));
            }
        }
    }

    fn on_recognition(&mut self, capture: u64, event: RecognitionEvent) {
        if capture != self.state.capture {
            debug!("Ignoring {:?} from old capture {}", event, capture);
            return;
        }

        match event {
            RecognitionEvent::Started => self.set_listening(true),
            RecognitionEvent::Result(transcript) => {
                let text = transcript.trim();
                if text.is_empty() {
                    return;
                }
                debug!("Transcript received ({} chars)", text.chars().count());
                self.append_user_message(text);
                self.send_to_endpoint(text.to_string());
            }
            RecognitionEvent::Error(reason) => {
                warn!("Capture error: {}", reason);
                self.push_system(format!("Error: {}", reason));
            }
            RecognitionEvent::Ended => self.set_listening(false),
        }
    }

    fn poll_speech(&mut self) {
        if self.state.active_utterance.is_some() && !self.output.is_speaking() {
            self.state.active_utterance = None;
            self.emit(ControllerEvent::SpeakingChanged(false));
        }
    }

    fn append_user_message(&mut self, text: &str) {
        if self.state.conversation.clear_system_messages() > 0 {
            self.emit(ControllerEvent::SystemMessagesCleared);
        }
        self.push(Message::user(text));
    }

    fn push_capability_notices(&mut self) {
        if self.input.is_none() {
            self.push_system(VOICE_INPUT_UNAVAILABLE);
        }
        if !self.voice_output {
            self.push_system(VOICE_OUTPUT_UNAVAILABLE);
        }
    }

    fn push_system(&mut self, text: impl Into<String>) {
        self.push(Message::system(text));
    }

    fn push(&mut self, message: Message) {
        self.state.conversation.push(message.clone());
        self.emit(ControllerEvent::MessageAppended(message));
    }

    fn set_listening(&mut self, listening: bool) {
        if self.state.listening != listening {
            self.state.listening = listening;
            self.emit(ControllerEvent::ListeningChanged(listening));
        }
    }

    fn set_reply_pending(&mut self, pending: bool) {
        if self.state.reply_in_flight != pending {
            self.state.reply_in_flight = pending;
            self.emit(ControllerEvent::ReplyPending(pending));
        }
    }

    fn emit(&self, event: ControllerEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Builder for creating a controller
pub struct ControllerBuilder {
    config: SpeechConfig,
    endpoint: Option<Arc<dyn ChatEndpoint>>,
    output: Option<Box<dyn SpeechOutput>>,
    input: Option<Box<dyn SpeechInput>>,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            config: SpeechConfig::default(),
            endpoint: None,
            output: None,
            input: None,
        }
    }

    /// Set the speech configuration (voice preference, prosody)
    pub fn with_config(mut self, config: SpeechConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_endpoint(mut self, endpoint: Arc<dyn ChatEndpoint>) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    pub fn with_output(mut self, output: Box<dyn SpeechOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_input(mut self, input: Box<dyn SpeechInput>) -> Self {
        self.input = Some(input);
        self
    }

    /// Set the output when one was found; `None` means text-only replies
    pub fn with_optional_output(mut self, output: Option<Box<dyn SpeechOutput>>) -> Self {
        self.output = output;
        self
    }

    /// Set the input when one was found; `None` means typed input only
    pub fn with_optional_input(mut self, input: Option<Box<dyn SpeechInput>>) -> Self {
        self.input = input;
        self
    }

    /// Build the controller
    pub fn build(self) -> Result<(InteractionController, ControllerHandle)> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| VoicebotError::ConfigError("chat endpoint is required".into()))?;
        Ok(InteractionController::new(
            &self.config,
            endpoint,
            self.output,
            self.input,
        ))
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
