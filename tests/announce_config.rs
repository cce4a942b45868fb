use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use hazard_callout::config::AnnounceConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "ANNOUNCE_CONFIG",
        "ANNOUNCE_TTS_BIN",
        "ANNOUNCE_MODELS_DIR",
        "ANNOUNCE_NOTIFY_INTERVAL_S",
        "ANNOUNCE_DANGER_INTERVAL_S",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AnnounceConfig::load().expect("load defaults");
    assert_eq!(cfg.notify_interval_s, 3.0);
    assert_eq!(cfg.danger_interval_s, 0.3);
    assert_eq!(cfg.speech.binary, "espeak");
    assert!(cfg.speech.args.is_empty());
    assert_eq!(cfg.models.dir, PathBuf::from("models"));
    assert_eq!(cfg.capture.width, 640);
    assert_eq!(cfg.capture.height, 480);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "alerts": { "notify_interval_s": 5.0, "danger_interval_s": 0.5 },
            "tts": { "binary": "espeak-ng", "args": ["-s", "160"] },
            "models": { "dir": "/opt/networks", "input_width": 320, "input_height": 320 },
            "capture": { "width": 1280, "height": 720, "target_fps": 15 }
        }"#,
    );

    std::env::set_var("ANNOUNCE_CONFIG", file.path());
    std::env::set_var("ANNOUNCE_DANGER_INTERVAL_S", "0.25");
    std::env::set_var("ANNOUNCE_TTS_BIN", "say");

    let cfg = AnnounceConfig::load().expect("load config");

    assert_eq!(cfg.notify_interval_s, 5.0);
    assert_eq!(cfg.danger_interval_s, 0.25);
    assert_eq!(cfg.speech.binary, "say");
    assert_eq!(cfg.speech.args, vec!["-s", "160"]);
    assert_eq!(cfg.models.dir, PathBuf::from("/opt/networks"));
    assert_eq!(cfg.models.input_width, 320);
    assert_eq!(cfg.capture.width, 1280);
    assert_eq!(cfg.capture.height, 720);
    assert_eq!(cfg.capture.target_fps, 15);

    let cooldowns = cfg.cooldown_policy().expect("cooldowns");
    assert_eq!(cooldowns.cooldown_for(1), 5.0);
    assert_eq!(cooldowns.cooldown_for(3), 0.25);

    clear_env();
}

#[test]
fn rejects_unknown_fields() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "alerts": { "notify_every": 2.0 } }"#);
    std::env::set_var("ANNOUNCE_CONFIG", file.path());
    assert!(AnnounceConfig::load().is_err());

    clear_env();
}

#[test]
fn rejects_negative_or_malformed_intervals() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ANNOUNCE_NOTIFY_INTERVAL_S", "-1");
    assert!(AnnounceConfig::load().is_err());

    std::env::set_var("ANNOUNCE_NOTIFY_INTERVAL_S", "later");
    assert!(AnnounceConfig::load().is_err());

    clear_env();
    let file = write_config(r#"{ "capture": { "width": 0 } }"#);
    std::env::set_var("ANNOUNCE_CONFIG", file.path());
    assert!(AnnounceConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ANNOUNCE_CONFIG", "/nonexistent/announce.json");
    let err = AnnounceConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
