//! Speech synthesizer subprocess.
//!
//! Runs `<binary> [args..] <phrase>` with all standard streams detached. The child is
//! never awaited; finished children are reaped with `try_wait` on later calls.

use std::process::{Child, Command, Stdio};

use anyhow::{Context, Result};

use super::Notifier;

pub const DEFAULT_TTS_BINARY: &str = "espeak";

/// Configuration for the speech subprocess.
#[derive(Clone, Debug)]
pub struct SpeechConfig {
    /// Synthesizer executable (looked up on `PATH`).
    pub binary: String,
    /// Arguments placed before the phrase (e.g. voice or rate flags).
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_TTS_BINARY.to_string(),
            args: Vec::new(),
        }
    }
}

/// Fire-and-forget speech notifier.
pub struct SpeechNotifier {
    config: SpeechConfig,
    children: Vec<Child>,
    spoken: u64,
}

impl SpeechNotifier {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            config,
            children: Vec::new(),
            spoken: 0,
        }
    }

    /// Children that have not exited yet.
    pub fn in_flight(&mut self) -> usize {
        self.reap();
        self.children.len()
    }

    pub fn spoken(&self) -> u64 {
        self.spoken
    }

    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    log::debug!("speech process {} exited with {}", child.id(), status);
                }
                false
            }
            Ok(None) => true,
            Err(err) => {
                log::warn!("failed to poll speech process {}: {}", child.id(), err);
                false
            }
        });
    }
}

impl Notifier for SpeechNotifier {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.reap();
        let child = Command::new(&self.config.binary)
            .args(&self.config.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn speech process '{}'", self.config.binary))?;
        log::debug!("speech process {} started", child.id());
        self.children.push(child);
        self.spoken += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_fails_to_speak() {
        let mut notifier = SpeechNotifier::new(SpeechConfig {
            binary: "/nonexistent/hazard-callout-tts".to_string(),
            args: Vec::new(),
        });
        let err = notifier.speak("Warning. Car ahead").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/hazard-callout-tts"));
        assert_eq!(notifier.spoken(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn spawned_children_are_reaped() -> Result<()> {
        let mut notifier = SpeechNotifier::new(SpeechConfig {
            binary: "true".to_string(),
            args: Vec::new(),
        });
        notifier.speak("Warning. Human ahead")?;
        assert_eq!(notifier.spoken(), 1);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while notifier.in_flight() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(notifier.in_flight(), 0);
        Ok(())
    }
}
