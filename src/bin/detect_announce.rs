//! detect_announce - speak warnings for objects seen by a camera
//!
//! This binary:
//! 1. Opens the camera input and the display/stream output
//! 2. Loads the detection network
//! 3. Runs the detection loop, speaking "Warning. <objects> ahead" with per-class cooldowns
//! 4. Stops on Ctrl-C or when either stream ends

use anyhow::{Context, Result};
use clap::Parser;

use hazard_callout::{
    open_output, open_source, AlertPolicy, AnnounceConfig, CancelToken, LabelTable, LogNotifier,
    NetworkRegistry, NetworkSpec, Notifier, Pipeline, SpeechNotifier, StopReason,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Camera input (e.g. /dev/video0, csi://0, rtsp://host/stream, stub://demo).
    /// /dev/videoN needs the ingest-v4l2 feature; csi://, rtsp:// and file:// need
    /// video-gstreamer. stub:// always works.
    input: String,
    /// Output display or stream (e.g. display://0, rtp://host:5000, null://).
    /// display:// and rtp:// need video-gstreamer; snapshot:// needs output-snapshot.
    output: String,
    /// Detection network to load. Anything but "stub" is an ONNX model under the
    /// models directory and needs the backend-tract feature.
    #[arg(long, env = "ANNOUNCE_NETWORK", default_value = "ssd-mobilenet-v2")]
    network: String,
    /// Minimum detection confidence.
    #[arg(long, env = "ANNOUNCE_THRESHOLD", default_value_t = 0.6)]
    threshold: f32,
    /// Log warnings instead of speaking them.
    #[arg(long)]
    mute: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = AnnounceConfig::load()?;

    let policy = AlertPolicy::new(
        LabelTable::coco_hazards(),
        cfg.cooldown_policy()?,
        args.threshold,
    )?;

    let detector = NetworkRegistry::with_builtins().open(&NetworkSpec {
        name: args.network.clone(),
        models_dir: cfg.models.dir.clone(),
        input_width: cfg.models.input_width,
        input_height: cfg.models.input_height,
        threshold: args.threshold,
    })?;

    let source = open_source(&args.input, &cfg.capture)
        .with_context(|| format!("input {}", args.input))?;
    let output = open_output(&args.output).with_context(|| format!("output {}", args.output))?;

    let notifier: Box<dyn Notifier> = if args.mute {
        Box::new(LogNotifier)
    } else {
        Box::new(SpeechNotifier::new(cfg.speech.clone()))
    };

    let cancel = CancelToken::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || handle.cancel()).expect("error setting Ctrl-C handler");

    let mut pipeline = Pipeline::new(source, detector, policy, notifier, output);
    pipeline.start()?;
    log::info!(
        "detect_announce running: {} -> {} (network {}, cooldowns {}s/{}s)",
        args.input,
        args.output,
        args.network,
        cfg.notify_interval_s,
        cfg.danger_interval_s
    );

    let summary = pipeline.run(&cancel)?;
    if summary.stop_reason == StopReason::Cancelled {
        println!("\n🛑 Detection stopped by user.");
    }
    log::info!(
        "processed {} frames, spoke {} warnings",
        summary.frames_processed,
        summary.alerts_spoken
    );

    Ok(())
}
