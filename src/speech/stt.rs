//! Speech capture through an external recognizer
//!
//! The recognizer is a program that listens on the microphone, prints the
//! final transcript on stdout and exits. Interim results are not used; one run
//! yields at most one transcript.

use crate::config::{CommandSpec, SpeechConfig};
use crate::speech::{expand_args, find_program, RecognitionEvent, RecognitionSink, SpeechInput};
use crate::{Result, VoicebotError};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

/// Reason reported when the recognizer heard nothing
pub const NO_SPEECH: &str = "no-speech";

/// Recognizer backed by an external program
pub struct CommandRecognizer {
    spec: CommandSpec,
    lang: String,
    /// Running recognizer, tagged with the run that spawned it
    child: Arc<Mutex<Option<(u64, Child)>>>,
    runs: u64,
}

impl CommandRecognizer {
    pub fn new(spec: CommandSpec, lang: impl Into<String>) -> Self {
        Self {
            spec,
            lang: lang.into(),
            child: Arc::new(Mutex::new(None)),
            runs: 0,
        }
    }

    /// Build from configuration, failing when the program is not installed
    pub fn from_config(config: &SpeechConfig) -> Result<Self> {
        let program = find_program(&config.recognizer.program).ok_or_else(|| {
            VoicebotError::Unsupported(format!("Voice input ({})", config.recognizer.program))
        })?;
        info!("Speech capture via {}", program.display());

        Ok(Self::new(config.recognizer.clone(), config.lang.clone()))
    }
}

impl SpeechInput for CommandRecognizer {
    fn start(&mut self, sink: RecognitionSink) -> Result<()> {
        if self.is_listening() {
            return Err(VoicebotError::SpeechInputError(
                "capture already running".into(),
            ));
        }

        let args = expand_args(&self.spec.args, &[("lang", self.lang.as_str())]);
        let mut child = Command::new(&self.spec.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                VoicebotError::SpeechInputError(format!("failed to run {}: {}", self.spec.program, e))
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VoicebotError::SpeechInputError(
                    "recognizer has no stdout".into(),
                ));
            }
        };

        self.runs += 1;
        let run = self.runs;
        *self.child.lock() = Some((run, child));
        sink(RecognitionEvent::Started);
        debug!("Capture {} started", run);

        let slot = Arc::clone(&self.child);
        let spawned = thread::Builder::new()
            .name("voicebot-capture".into())
            .spawn(move || {
                let transcript = read_transcript(stdout);

                // The slot may be empty or hold a later run once this one was aborted
                let own = {
                    let mut guard = slot.lock();
                    match guard.take() {
                        Some((id, child)) if id == run => Some(child),
                        other => {
                            *guard = other;
                            None
                        }
                    }
                };
                let status = own.map(|mut child| child.wait());
                match status {
                    None => debug!("Capture {} aborted", run),
                    Some(Ok(status)) if status.success() => match transcript {
                        Some(text) => sink(RecognitionEvent::Result(text)),
                        None => sink(RecognitionEvent::Error(NO_SPEECH.to_string())),
                    },
                    Some(Ok(status)) => {
                        warn!("Recognizer exited with {}", status);
                        sink(RecognitionEvent::Error(format!("recognizer exited with {}", status)));
                    }
                    Some(Err(e)) => sink(RecognitionEvent::Error(e.to_string())),
                }

                sink(RecognitionEvent::Ended);
            });

        if let Err(e) = spawned {
            self.abort();
            return Err(VoicebotError::SpeechInputError(format!(
                "failed to start capture thread: {}",
                e
            )));
        }

        Ok(())
    }

    fn abort(&mut self) {
        if let Some((_, mut child)) = self.child.lock().take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Capture aborted by request");
        }
    }

    fn is_listening(&self) -> bool {
        self.child.lock().is_some()
    }
}

impl Drop for CommandRecognizer {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Read the whole recognizer output; non-empty lines form the transcript
fn read_transcript(stdout: impl Read) -> Option<String> {
    let lines: Vec<String> = BufReader::new(stdout)
        .lines()
        .map_while(|line| line.ok())
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Receiver};
    use std::time::Duration;

    fn sink() -> (RecognitionSink, Receiver<RecognitionEvent>) {
        let (tx, rx) = unbounded();
        let sink: RecognitionSink = Box::new(move |event| {
            let _ = tx.send(event);
        });
        (sink, rx)
    }

    fn collect_until_ended(rx: &Receiver<RecognitionEvent>) -> Vec<RecognitionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
            let done = event == RecognitionEvent::Ended;
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    #[test]
    fn test_read_transcript_joins_lines() {
        let output = "\n  tell me about\nyour superpower  \n\n";
        assert_eq!(
            read_transcript(output.as_bytes()),
            Some("tell me about your superpower".to_string())
        );
        assert_eq!(read_transcript("  \n".as_bytes()), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_reports_transcript() {
        let mut recognizer =
            CommandRecognizer::new(CommandSpec::new("echo", &["hello", "{lang}"]), "en-US");
        let (sink, rx) = sink();

        recognizer.start(sink).unwrap();
        let events = collect_until_ended(&rx);

        assert_eq!(
            events,
            vec![
                RecognitionEvent::Started,
                RecognitionEvent::Result("hello en-US".to_string()),
                RecognitionEvent::Ended,
            ]
        );
        assert!(!recognizer.is_listening());
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_without_output_is_no_speech() {
        let mut recognizer = CommandRecognizer::new(CommandSpec::new("true", &[]), "en-US");
        let (sink, rx) = sink();

        recognizer.start(sink).unwrap();
        let events = collect_until_ended(&rx);
        assert_eq!(events[1], RecognitionEvent::Error(NO_SPEECH.to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_recognizer_reports_error() {
        let mut recognizer =
            CommandRecognizer::new(CommandSpec::new("sh", &["-c", "exit 3"]), "en-US");
        let (sink, rx) = sink();

        recognizer.start(sink).unwrap();
        let events = collect_until_ended(&rx);
        assert!(matches!(events[1], RecognitionEvent::Error(_)));
        assert_eq!(events.last(), Some(&RecognitionEvent::Ended));
    }

    #[cfg(unix)]
    #[test]
    fn test_abort_suppresses_result() {
        let mut recognizer = CommandRecognizer::new(CommandSpec::new("sleep", &["5"]), "en-US");
        let (sink, rx) = sink();

        recognizer.start(sink).unwrap();
        assert!(recognizer.is_listening());
        assert!(recognizer.start(Box::new(|_| {})).is_err());

        recognizer.abort();
        assert!(!recognizer.is_listening());

        let events = collect_until_ended(&rx);
        assert_eq!(
            events,
            vec![RecognitionEvent::Started, RecognitionEvent::Ended]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_restart_after_abort_keeps_new_transcript() {
        // First run leaves a grandchild holding stdout open, second run answers
        let marker = std::env::temp_dir().join(format!("voicebot-capture-{}", std::process::id()));
        let _ = std::fs::remove_file(&marker);
        let script = r#"if [ -e "$0" ]; then sleep 2; echo hello; else touch "$0"; (sleep 1) & fi"#;
        let marker_arg = marker.to_string_lossy().into_owned();
        let mut recognizer = CommandRecognizer::new(
            CommandSpec::new("sh", &["-c", script, marker_arg.as_str()]),
            "en-US",
        );

        let (first_sink, first_rx) = sink();
        recognizer.start(first_sink).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        recognizer.abort();
        assert!(marker.exists());

        let (second_sink, second_rx) = sink();
        recognizer.start(second_sink).unwrap();

        let first = collect_until_ended(&first_rx);
        let second = collect_until_ended(&second_rx);
        let _ = std::fs::remove_file(&marker);

        assert_eq!(first, vec![RecognitionEvent::Started, RecognitionEvent::Ended]);
        assert_eq!(
            second,
            vec![
                RecognitionEvent::Started,
                RecognitionEvent::Result("hello".to_string()),
                RecognitionEvent::Ended,
            ]
        );
    }

    #[test]
    fn test_from_config_missing_program() {
        let mut config = SpeechConfig::default();
        config.recognizer.program = "voicebot-no-such-recognizer".to_string();
        assert!(matches!(
            CommandRecognizer::from_config(&config),
            Err(VoicebotError::Unsupported(_))
        ));
    }
}
