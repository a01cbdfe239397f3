//! Configuration for the voicebot client
//!
//! Settings are read from a TOML file. Every field has a default, so a missing
//! file or a partial file is fine.

use crate::speech::Voice;
use crate::{Result, VoicebotError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "VOICEBOT_CONFIG";

/// Environment variable overriding the endpoint base URL
pub const ENDPOINT_ENV: &str = "VOICEBOT_ENDPOINT";

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoicebotConfig {
    /// Remote chat endpoint
    pub endpoint: EndpointConfig,

    /// Speech capture and playback
    pub speech: SpeechConfig,
}

/// Where the chat service lives
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Scheme, host and port of the service
    pub base_url: String,

    /// Path of the chat call
    pub chat_path: String,

    /// Path of the session reset call
    pub reset_path: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            chat_path: "/api/chat/".to_string(),
            reset_path: "/api/reset-session/".to_string(),
            timeout_secs: 30,
        }
    }
}

impl EndpointConfig {
    pub fn chat_url(&self) -> String {
        join_url(&self.base_url, &self.chat_path)
    }

    pub fn reset_url(&self) -> String {
        join_url(&self.base_url, &self.reset_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// An external program plus its argument template
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Speech capability configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether to use speech capture at all
    pub enable_input: bool,

    /// Whether to speak replies at all
    pub enable_output: bool,

    /// Recognition language
    pub lang: String,

    /// Capture program; prints the transcript on stdout
    pub recognizer: CommandSpec,

    /// Playback program; speaks its arguments
    pub speaker: CommandSpec,

    /// Voices the speaker offers
    pub voices: Vec<Voice>,

    /// Voice name to prefer over the built-in heuristic
    pub preferred_voice: Option<String>,

    /// Speech rate (1.0 = normal)
    pub rate: f32,

    /// Speech pitch (1.0 = normal)
    pub pitch: f32,

    /// Speech volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enable_input: true,
            enable_output: true,
            lang: "en-US".to_string(),
            recognizer: CommandSpec::new("voicebot-listen", &["--lang", "{lang}"]),
            speaker: CommandSpec::new("espeak-ng", &["-v", "{voice}", "-s", "{rate_wpm}", "--", "{text}"]),
            voices: vec![Voice::new("en-us", "en-US")],
            preferred_voice: None,
            rate: 1.02,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl VoicebotConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| VoicebotError::ConfigError(e.to_string()))
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            VoicebotError::ConfigError(format!("{}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content).map_err(|e| {
            VoicebotError::ConfigError(format!("{}: {}", path.display(), e))
        })?;

        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `$VOICEBOT_CONFIG`, then the user config directory, else defaults.
    ///
    /// `$VOICEBOT_ENDPOINT` overrides the endpoint base URL in every case.
    pub fn load_default() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load(PathBuf::from(path))?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(path)?,
                None => {
                    debug!("No configuration file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(std::env::var(ENDPOINT_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/voicebot/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voicebot").join("config.toml"))
    }

    /// Apply an endpoint override taken from the environment
    pub fn apply_overrides(&mut self, endpoint: Option<String>) {
        if let Some(url) = endpoint.filter(|u| !u.trim().is_empty()) {
            info!("Endpoint overridden from environment: {}", url);
            self.endpoint.base_url = url.trim().to_string();
        }
    }

    /// Set the endpoint base URL
    pub fn with_endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint.base_url = base_url.into();
        self
    }

    /// Set the preferred voice name
    pub fn with_voice(mut self, name: impl Into<String>) -> Self {
        self.speech.preferred_voice = Some(name.into());
        self
    }

    /// Disable speech capture (typed input only)
    pub fn without_audio_input(mut self) -> Self {
        self.speech.enable_input = false;
        self
    }

    /// Disable speech playback (text replies only)
    pub fn without_audio_output(mut self) -> Self {
        self.speech.enable_output = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let url = &self.endpoint.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(VoicebotError::ConfigError(format!(
                "endpoint base_url must be an http(s) URL: {}",
                url
            )));
        }

        if self.endpoint.timeout_secs == 0 {
            return Err(VoicebotError::ConfigError(
                "endpoint timeout_secs must be positive".into(),
            ));
        }

        let speech = &self.speech;
        if speech.enable_input && speech.recognizer.program.trim().is_empty() {
            return Err(VoicebotError::ConfigError(
                "speech recognizer program is required when input is enabled".into(),
            ));
        }
        if speech.enable_output && speech.speaker.program.trim().is_empty() {
            return Err(VoicebotError::ConfigError(
                "speech speaker program is required when output is enabled".into(),
            ));
        }

        if !(0.1..=10.0).contains(&speech.rate) {
            return Err(VoicebotError::ConfigError(format!(
                "speech rate out of range: {}",
                speech.rate
            )));
        }
        if !(0.0..=2.0).contains(&speech.pitch) {
            return Err(VoicebotError::ConfigError(format!(
                "speech pitch out of range: {}",
                speech.pitch
            )));
        }
        if !(0.0..=1.0).contains(&speech.volume) {
            return Err(VoicebotError::ConfigError(format!(
                "speech volume out of range: {}",
                speech.volume
            )));
        }

        Ok(())
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
