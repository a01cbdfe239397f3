//! Speech playback through an external synthesizer
//!
//! The synthesizer is any program that speaks its arguments and exits when it
//! is done (espeak-ng, say, spd-say --wait). One child process is one
//! utterance, so cutting speech off is killing the child.

use crate::config::{CommandSpec, SpeechConfig};
use crate::speech::{expand_args, find_program, SpeechOutput, Utterance, Voice};
use crate::{Result, VoicebotError};
use std::process::{Child, Command, Stdio};
use tracing::{debug, info, warn};

/// Words per minute at rate 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Synthesizer backed by an external program
pub struct CommandSpeaker {
    spec: CommandSpec,
    voices: Vec<Voice>,
    fallback_voice: String,
    child: Option<Child>,
}

impl CommandSpeaker {
    pub fn new(spec: CommandSpec, voices: Vec<Voice>, fallback_voice: impl Into<String>) -> Self {
        Self {
            spec,
            voices,
            fallback_voice: fallback_voice.into(),
            child: None,
        }
    }

    /// Build from configuration, failing when the program is not installed
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let program = find_program(&config.speaker.program).ok_or_else(|| {
            VoicebotError::Unsupported(format!("Speech output ({})", config.speaker.program))
        })?;
        info!("Speech output via {}", program.display());

        Ok(Self::new(
            config.speaker.clone(),
            config.voices.clone(),
            config.lang.to_lowercase(),
        ))
    }

    fn build_args(&self, utterance: &Utterance, text: &str) -> Vec<String> {
        let voice = utterance
            .voice
            .as_ref()
            .map(|v| v.name.clone())
            .unwrap_or_else(|| self.fallback_voice.clone());
        let rate_wpm = ((BASE_WORDS_PER_MINUTE * utterance.settings.rate).round() as u32).to_string();
        let pitch = ((utterance.settings.pitch * 50.0).round() as u32).to_string();
        let volume = ((utterance.settings.volume * 100.0).round() as u32).to_string();

        expand_args(
            &self.spec.args,
            &[
                ("voice", voice.as_str()),
                ("rate_wpm", rate_wpm.as_str()),
                ("pitch", pitch.as_str()),
                ("volume", volume.as_str()),
                ("text", text),
            ],
        )
    }
}

impl SpeechOutput for CommandSpeaker {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<()> {
        // Never two utterances at once
        self.cancel();

        let text = normalize_text_for_tts(&utterance.text);
        if text.is_empty() {
            return Ok(());
        }

        let args = self.build_args(utterance, &text);
        let child = Command::new(&self.spec.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                VoicebotError::SpeechOutputError(format!("failed to run {}: {}", self.spec.program, e))
            })?;

        debug!(
            "Speaking utterance {} ({} chars)",
            utterance.id,
            text.chars().count()
        );
        self.child = Some(child);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Ok(Some(_)) = child.try_wait() {
                return;
            }
            if let Err(e) = child.kill() {
                warn!("Failed to stop speech output: {}", e);
            }
            let _ = child.wait();
            debug!("Speech output cancelled");
        }
    }

    fn is_speaking(&mut self) -> bool {
        let finished = match self.child.as_mut() {
            None => return false,
            Some(child) => !matches!(child.try_wait(), Ok(None)),
        };

        if finished {
            self.child = None;
        }
        !finished
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Normalize reply text for speech synthesis
///
/// Strips markdown markers the chat model may emit and spells out a few
/// symbols synthesizers read badly.
pub fn normalize_text_for_tts(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        let line = line.trim_start().trim_start_matches('#').trim_start();
        let line = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
            .unwrap_or(line);
        result.push_str(line);
        result.push(' ');
    }

    for marker in ["**", "__", "`"] {
        result = result.replace(marker, "");
    }

    let replacements = [
        ("&", " and "),
        ("%", " percent "),
        ("+", " plus "),
        ("e.g.", "for example"),
        ("i.e.", "that is"),
        ("etc.", "etcetera"),
        ("…", "..."),
    ];
    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
        .chars()
        .filter(|c| *c != '*')
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::UtteranceSettings;

    #[test]
    fn test_normalize_strips_markdown() {
        let text = "## Summary\n- **Fast** learner\n* adapts `quickly`";
        assert_eq!(
            normalize_text_for_tts(text),
            "Summary Fast learner adapts quickly"
        );
    }

    #[test]
    fn test_normalize_symbols() {
        let normalized = normalize_text_for_tts("ML & LLM projects, 100% focus");
        assert!(normalized.contains("ML and LLM"));
        assert!(normalized.contains("100 percent focus"));
    }

    #[test]
    fn test_normalize_whitespace_only() {
        assert_eq!(normalize_text_for_tts("  \n\t "), "");
    }

    #[test]
    fn test_build_args_fills_placeholders() {
        let speaker = CommandSpeaker::new(
            CommandSpec::new("espeak-ng", &["-v", "{voice}", "-s", "{rate_wpm}", "{text}"]),
            Vec::new(),
            "en-us",
        );
        let utterance = Utterance::new(
            "hello",
            None,
            UtteranceSettings {
                rate: 1.0,
                ..Default::default()
            },
        );
        let args = speaker.build_args(&utterance, "hello");
        assert_eq!(args, vec!["-v", "en-us", "-s", "175", "hello"]);

        let utterance = Utterance::new(
            "hello",
            Some(Voice::new("Google US English", "en-US")),
            UtteranceSettings {
                rate: 2.0,
                ..Default::default()
            },
        );
        let args = speaker.build_args(&utterance, "hello");
        assert_eq!(args[1], "Google US English");
        assert_eq!(args[3], "350");
    }

    #[test]
    fn test_default_template_keeps_leading_dash_as_text() {
        let speaker = CommandSpeaker::new(SpeechConfig::default().speaker, Vec::new(), "en-us");
        let text = normalize_text_for_tts("-5 degrees");
        let utterance = Utterance::new(text.as_str(), None, UtteranceSettings::default());

        let args = speaker.build_args(&utterance, &text);
        assert_eq!(args[args.len() - 2..], ["--", "-5 degrees"]);
    }

    #[test]
    fn test_from_config_missing_program() {
        let mut config = SpeechConfig::default();
        config.speaker.program = "voicebot-no-such-synth".to_string();
        assert!(matches!(
            CommandSpeaker::from_config(&config),
            Err(VoicebotError::Unsupported(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_utterance_replaces_playing_one() {
        let mut speaker = CommandSpeaker::new(CommandSpec::new("sleep", &["5"]), Vec::new(), "en-us");
        let settings = UtteranceSettings::default();

        speaker.speak(&Utterance::new("first", None, settings)).unwrap();
        assert!(speaker.is_speaking());
        let first_pid = speaker.child.as_ref().map(|c| c.id());

        speaker.speak(&Utterance::new("second", None, settings)).unwrap();
        assert!(speaker.is_speaking());
        assert_ne!(speaker.child.as_ref().map(|c| c.id()), first_pid);

        speaker.cancel();
        assert!(!speaker.is_speaking());
    }

    #[cfg(unix)]
    #[test]
    fn test_finished_utterance_is_not_speaking() {
        let mut speaker = CommandSpeaker::new(CommandSpec::new("true", &[]), Vec::new(), "en-us");
        speaker
            .speak(&Utterance::new("done", None, UtteranceSettings::default()))
            .unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while speaker.is_speaking() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(!speaker.is_speaking());
    }
}
