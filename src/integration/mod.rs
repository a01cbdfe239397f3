//! Integration layer
//!
//! Connects speech capture, the chat endpoint and speech output through the
//! interaction controller: Voice/Text -> Endpoint -> Transcript -> Speech

mod controller;

pub use controller::{
    ControllerBuilder, ControllerCommand, ControllerEvent, ControllerHandle, ControllerInput,
    InteractionController, SessionState, GENERIC_FAILURE, LISTENING, VOICE_INPUT_UNAVAILABLE,
    VOICE_OUTPUT_UNAVAILABLE,
};

use crate::client::{ChatEndpoint, HttpChatClient};
use crate::config::VoicebotConfig;
use crate::speech::{CommandRecognizer, CommandSpeaker, SpeechInput, SpeechOutput};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the real capabilities and start the controller on the current runtime
///
/// Must be called from within a tokio runtime. Speech capabilities that are
/// disabled or not installed leave the session in text-only mode.
pub fn spawn(config: &VoicebotConfig) -> Result<ControllerHandle> {
    let endpoint: Arc<dyn ChatEndpoint> = Arc::new(HttpChatClient::new(&config.endpoint)?);

    let output: Option<Box<dyn SpeechOutput>> = if config.speech.enable_output {
        match CommandSpeaker::from_config(&config.speech) {
            Ok(speaker) => Some(Box::new(speaker) as Box<dyn SpeechOutput>),
            Err(e) => {
                warn!("{}; replies will be text only", e);
                None
            }
        }
    } else {
        info!("Speech output disabled by configuration");
        None
    };

    let input: Option<Box<dyn SpeechInput>> = if config.speech.enable_input {
        match CommandRecognizer::from_config(&config.speech) {
            Ok(recognizer) => Some(Box::new(recognizer) as Box<dyn SpeechInput>),
            Err(e) => {
                warn!("{}; typed input only", e);
                None
            }
        }
    } else {
        info!("Speech capture disabled by configuration");
        None
    };

    let (controller, handle) = ControllerBuilder::new()
        .with_config(config.speech.clone())
        .with_endpoint(endpoint)
        .with_optional_output(output)
        .with_optional_input(input)
        .build()?;

    tokio::spawn(controller.run());
    Ok(handle)
}
