use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::CaptureSettings;
use crate::notify::{SpeechConfig, DEFAULT_TTS_BINARY};
use crate::policy::{CooldownPolicy, DEFAULT_DANGER_INTERVAL_S, DEFAULT_NOTIFY_INTERVAL_S};

const DEFAULT_MODELS_DIR: &str = "models";
const DEFAULT_MODEL_INPUT: u32 = 300;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_CAPTURE_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AnnounceConfigFile {
    alerts: Option<AlertsConfigFile>,
    tts: Option<TtsConfigFile>,
    models: Option<ModelsConfigFile>,
    capture: Option<CaptureConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AlertsConfigFile {
    notify_interval_s: Option<f64>,
    danger_interval_s: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TtsConfigFile {
    binary: Option<String>,
    args: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelsConfigFile {
    dir: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct AnnounceConfig {
    pub notify_interval_s: f64,
    pub danger_interval_s: f64,
    pub speech: SpeechConfig,
    pub models: ModelSettings,
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub dir: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
}

impl AnnounceConfig {
    /// Load from `ANNOUNCE_CONFIG` (optional JSON file), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ANNOUNCE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AnnounceConfigFile) -> Self {
        let alerts = file.alerts.unwrap_or_default();
        let tts = file.tts.unwrap_or_default();
        let models = file.models.unwrap_or_default();
        let capture = file.capture.unwrap_or_default();
        Self {
            notify_interval_s: alerts
                .notify_interval_s
                .unwrap_or(DEFAULT_NOTIFY_INTERVAL_S),
            danger_interval_s: alerts
                .danger_interval_s
                .unwrap_or(DEFAULT_DANGER_INTERVAL_S),
            speech: SpeechConfig {
                binary: tts
                    .binary
                    .unwrap_or_else(|| DEFAULT_TTS_BINARY.to_string()),
                args: tts.args.unwrap_or_default(),
            },
            models: ModelSettings {
                dir: models
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
                input_width: models.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
                input_height: models.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            },
            capture: CaptureSettings {
                width: capture.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
                height: capture.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
                target_fps: capture.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(binary) = std::env::var("ANNOUNCE_TTS_BIN") {
            if !binary.trim().is_empty() {
                self.speech.binary = binary;
            }
        }
        if let Ok(dir) = std::env::var("ANNOUNCE_MODELS_DIR") {
            if !dir.trim().is_empty() {
                self.models.dir = PathBuf::from(dir);
            }
        }
        if let Ok(value) = std::env::var("ANNOUNCE_NOTIFY_INTERVAL_S") {
            self.notify_interval_s = parse_seconds("ANNOUNCE_NOTIFY_INTERVAL_S", &value)?;
        }
        if let Ok(value) = std::env::var("ANNOUNCE_DANGER_INTERVAL_S") {
            self.danger_interval_s = parse_seconds("ANNOUNCE_DANGER_INTERVAL_S", &value)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.cooldown_policy()?;
        if self.speech.binary.trim().is_empty() {
            return Err(anyhow!("tts binary must not be empty"));
        }
        if self.models.input_width == 0 || self.models.input_height == 0 {
            return Err(anyhow!("model input size must be greater than zero"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!("capture size must be greater than zero"));
        }
        Ok(())
    }

    /// Cooldown table built from the configured intervals.
    pub fn cooldown_policy(&self) -> Result<CooldownPolicy> {
        CooldownPolicy::new(self.notify_interval_s, self.danger_interval_s)
    }
}

impl Default for AnnounceConfig {
    fn default() -> Self {
        Self::from_file(AnnounceConfigFile::default())
    }
}

fn read_config_file(path: &Path) -> Result<AnnounceConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn parse_seconds(name: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| anyhow!("{} must be a number of seconds", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_cooldowns() -> Result<()> {
        let cfg = AnnounceConfig::default();
        assert_eq!(cfg.notify_interval_s, 3.0);
        assert_eq!(cfg.danger_interval_s, 0.3);
        assert_eq!(cfg.speech.binary, "espeak");
        assert_eq!(cfg.models.input_width, 300);
        assert_eq!(cfg.capture, CaptureSettings::default());
        cfg.validate()?;
        Ok(())
    }

    #[test]
    fn parse_seconds_rejects_text() {
        assert!(parse_seconds("X", "soon").is_err());
        assert_eq!(parse_seconds("X", " 1.5 ").unwrap(), 1.5);
    }
}
