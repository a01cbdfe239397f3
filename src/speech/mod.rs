//! Speech capabilities for capture and playback
//!
//! This module provides:
//! - The `SpeechInput` / `SpeechOutput` capability traits the controller drives
//! - Speech capture through an external recognizer program
//! - Speech playback through an external synthesizer program
//! - A silent output used in text-only mode

pub mod stt;
pub mod tts;

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub use stt::CommandRecognizer;
pub use tts::{normalize_text_for_tts, CommandSpeaker};

/// Events produced by one capture run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Capture has started listening
    Started,
    /// Final transcript of the capture
    Result(String),
    /// Capture failed (reason as reported by the recognizer)
    Error(String),
    /// Capture is over, whatever the outcome
    Ended,
}

/// Callback receiving capture events; called from the capture thread
pub type RecognitionSink = Box<dyn Fn(RecognitionEvent) + Send + Sync + 'static>;

/// Microphone capture capability
pub trait SpeechInput: Send {
    /// Begin one capture run, reporting through `sink`
    fn start(&mut self, sink: RecognitionSink) -> Result<()>;

    /// Abort the running capture, if any
    fn abort(&mut self);

    fn is_listening(&self) -> bool;
}

/// Speech playback capability
pub trait SpeechOutput: Send {
    /// Voices this output can speak with
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    /// Start speaking; any utterance already playing is cut off first
    fn speak(&mut self, utterance: &Utterance) -> Result<()>;

    /// Halt playback immediately
    fn cancel(&mut self);

    fn is_speaking(&mut self) -> bool;
}

/// A voice offered by a speech output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// Prosody applied to an utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtteranceSettings {
    /// 1.0 = normal speed
    pub rate: f32,
    /// 1.0 = normal pitch
    pub pitch: f32,
    /// 0.0 to 1.0
    pub volume: f32,
}

impl Default for UtteranceSettings {
    fn default() -> Self {
        Self {
            rate: 1.02,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

/// A single speech-output playback unit
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: Uuid,
    pub text: String,
    pub voice: Option<Voice>,
    pub settings: UtteranceSettings,
}

impl Utterance {
    pub fn new(text: impl Into<String>, voice: Option<Voice>, settings: UtteranceSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            voice,
            settings,
        }
    }
}

/// Pick the voice to speak with.
///
/// Order: the configured name, "Google US English", any Google en-US voice,
/// any en-US voice, then whatever comes first.
pub fn select_voice(voices: &[Voice], preferred: Option<&str>) -> Option<Voice> {
    preferred
        .and_then(|name| voices.iter().find(|v| v.name == name))
        .or_else(|| voices.iter().find(|v| v.name == "Google US English"))
        .or_else(|| {
            voices
                .iter()
                .find(|v| v.name.contains("Google") && v.lang == "en-US")
        })
        .or_else(|| voices.iter().find(|v| v.lang == "en-US"))
        .or_else(|| voices.first())
        .cloned()
}

/// Substitute `{name}` placeholders in an argument template
pub fn expand_args(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
        })
        .collect()
}

/// Resolve a program name against `PATH`
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|path| path.is_file())
}

/// Output used when no synthesizer is available; replies stay text-only
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl SpeechOutput for SilentSpeaker {
    fn speak(&mut self, _utterance: &Utterance) -> Result<()> {
        Ok(())
    }

    fn cancel(&mut self) {}

    fn is_speaking(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voices() -> Vec<Voice> {
        vec![
            Voice::new("Alex", "en-GB"),
            Voice::new("Samantha", "en-US"),
            Voice::new("Google UK English Male", "en-GB"),
            Voice::new("Google español", "es-ES"),
        ]
    }

    #[test]
    fn test_select_voice_prefers_configured_name() {
        let picked = select_voice(&voices(), Some("Alex")).unwrap();
        assert_eq!(picked.name, "Alex");
    }

    #[test]
    fn test_select_voice_heuristic_order() {
        let mut list = voices();
        assert_eq!(select_voice(&list, None).unwrap().name, "Samantha");

        list.push(Voice::new("Google US English", "en-US"));
        assert_eq!(select_voice(&list, Some("Missing")).unwrap().name, "Google US English");

        list.pop();
        list.push(Voice::new("Google en-US Wavenet", "en-US"));
        assert_eq!(select_voice(&list, None).unwrap().name, "Google en-US Wavenet");
    }

    #[test]
    fn test_select_voice_falls_back_to_first() {
        let list = vec![Voice::new("Thomas", "fr-FR"), Voice::new("Anna", "de-DE")];
        assert_eq!(select_voice(&list, None).unwrap().name, "Thomas");
        assert!(select_voice(&[], None).is_none());
    }

    #[test]
    fn test_expand_args() {
        let template = vec!["-v".to_string(), "{voice}".to_string(), "say: {text}".to_string()];
        let args = expand_args(&template, &[("voice", "en-us"), ("text", "hello")]);
        assert_eq!(args, vec!["-v", "en-us", "say: hello"]);
    }

    #[test]
    fn test_find_program_missing() {
        assert!(find_program("voicebot-definitely-not-installed").is_none());
    }

    #[test]
    fn test_utterance_defaults() {
        let utterance = Utterance::new("hi", None, UtteranceSettings::default());
        assert!((utterance.settings.rate - 1.02).abs() < f32::EPSILON);
        assert_eq!(utterance.settings.volume, 1.0);
    }
}
