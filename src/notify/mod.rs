//! Speech notification.
//!
//! A `Notifier` turns a warning phrase into audio. The production notifier spawns a
//! speech synthesizer as a detached child process and never waits on it; overlapping
//! phrases are not queued.

mod speech;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

pub use speech::{SpeechConfig, SpeechNotifier, DEFAULT_TTS_BINARY};

/// Speaks a phrase.
pub trait Notifier {
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Logs phrases instead of speaking them (`--mute`).
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn speak(&mut self, text: &str) -> Result<()> {
        log::info!("(muted) {}", text);
        Ok(())
    }
}

/// Records every phrase. Clones share the same record.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    phrases: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phrases spoken so far, oldest first.
    pub fn phrases(&self) -> Vec<String> {
        self.phrases
            .lock()
            .map(|phrases| phrases.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.phrases
            .lock()
            .map_err(|_| anyhow!("recording notifier lock poisoned"))?
            .push(text.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_clones_share_phrases() -> Result<()> {
        let recorder = RecordingNotifier::new();
        let mut boxed: Box<dyn Notifier> = Box::new(recorder.clone());
        boxed.speak("Warning. Car ahead")?;
        boxed.speak("Warning. Dog ahead")?;
        assert_eq!(
            recorder.phrases(),
            vec!["Warning. Car ahead", "Warning. Dog ahead"]
        );
        Ok(())
    }

    #[test]
    fn log_notifier_accepts_phrases() {
        assert!(LogNotifier.speak("Warning. Bus ahead").is_ok());
    }
}
