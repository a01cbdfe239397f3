pub mod client;
pub mod config;
pub mod integration;
pub mod messages;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum VoicebotError {
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Endpoint error: {0}")]
    EndpointError(String),

    #[error("Speech input error: {0}")]
    SpeechInputError(String),

    #[error("Speech output error: {0}")]
    SpeechOutputError(String),

    #[error("Capability unavailable: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for VoicebotError {
    fn from(e: std::io::Error) -> Self {
        VoicebotError::IOError(e.to_string())
    }
}

impl From<reqwest::Error> for VoicebotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            VoicebotError::TransportError(format!("request timed out: {}", e))
        } else if e.is_status() || e.is_decode() {
            VoicebotError::EndpointError(e.to_string())
        } else {
            VoicebotError::TransportError(e.to_string())
        }
    }
}

impl VoicebotError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A new request may succeed where this one failed
            VoicebotError::TransportError(_) => true,
            VoicebotError::EndpointError(_) => true,
            VoicebotError::SpeechInputError(_) => true,
            VoicebotError::SpeechOutputError(_) => true,
            // Missing capabilities stay missing for the session
            VoicebotError::Unsupported(_) => false,
            VoicebotError::IOError(_) => false,
            VoicebotError::ConfigError(_) => false,
            VoicebotError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            VoicebotError::TransportError(_) | VoicebotError::EndpointError(_) => {
                "Sorry, something went wrong.".to_string()
            }
            VoicebotError::SpeechInputError(_) => {
                "Speech recognition failed. Please try again.".to_string()
            }
            VoicebotError::SpeechOutputError(_) => {
                "Speech output failed. Replies will be shown as text.".to_string()
            }
            VoicebotError::Unsupported(what) => {
                format!("{} is not available on this system.", what)
            }
            VoicebotError::IOError(_) => "File system error occurred.".to_string(),
            VoicebotError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            VoicebotError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, VoicebotError>;
