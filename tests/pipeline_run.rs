use std::cell::Cell;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use hazard_callout::detect::labels::{CAR, HUMAN};
use hazard_callout::{
    open_output, open_source, AlertPolicy, CancelToken, CaptureSettings, Clock, CooldownPolicy,
    Detection, Frame, LabelTable, NullOutput, Pipeline, RecordingNotifier, SpeechConfig,
    SpeechNotifier, StopReason, StubBackend, SyntheticSource, VideoOutput,
};

/// Clock that advances by a fixed step every time it is read.
struct SteppingClock {
    now: Cell<f64>,
    step: f64,
}

impl SteppingClock {
    fn new(start: f64, step: f64) -> Self {
        Self {
            now: Cell::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now_epoch_s(&self) -> f64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Output that records every status line it is given. Clones share the record.
#[derive(Clone, Default)]
struct StatusLog {
    statuses: Arc<Mutex<Vec<String>>>,
    frames: Arc<Mutex<u64>>,
}

impl VideoOutput for StatusLog {
    fn render(&mut self, _frame: &Frame) -> Result<()> {
        *self.frames.lock().unwrap() += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.statuses.lock().unwrap().push(status.to_string());
    }

    fn is_streaming(&self) -> bool {
        true
    }
}

fn policy() -> AlertPolicy {
    AlertPolicy::new(LabelTable::coco_hazards(), CooldownPolicy::default(), 0.6)
        .expect("default policy")
}

#[test]
fn stub_source_ends_the_run() -> Result<()> {
    let notifier = RecordingNotifier::new();
    let mut pipeline = Pipeline::new(
        open_source("stub://street?frames=12&width=16&height=12", &CaptureSettings::default())?,
        Box::new(StubBackend::with_scenes(vec![vec![]], 1)),
        policy(),
        Box::new(notifier.clone()),
        open_output("null://")?,
    );
    pipeline.start()?;

    let summary = pipeline.run(&CancelToken::new())?;
    assert_eq!(summary.stop_reason, StopReason::SourceEnded);
    assert_eq!(summary.frames_processed, 12);
    assert_eq!(summary.alerts_spoken, 0);
    assert!(notifier.phrases().is_empty());
    Ok(())
}

#[test]
fn output_frame_limit_closes_the_run() -> Result<()> {
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://endless", 8, 8, None)),
        Box::new(StubBackend::new()),
        policy(),
        Box::new(RecordingNotifier::new()),
        Box::new(NullOutput::new(Some(4))),
    );
    pipeline.start()?;

    let summary = pipeline.run(&CancelToken::new())?;
    assert_eq!(summary.stop_reason, StopReason::OutputClosed);
    assert_eq!(summary.frames_processed, 4);
    Ok(())
}

#[test]
fn cancelled_before_start_processes_nothing() -> Result<()> {
    let notifier = RecordingNotifier::new();
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://endless", 8, 8, None)),
        Box::new(StubBackend::with_scenes(vec![vec![Detection::new(HUMAN, 0.9)]], 1)),
        policy(),
        Box::new(notifier.clone()),
        Box::new(NullOutput::new(None)),
    );
    pipeline.start()?;

    let cancel = CancelToken::new();
    cancel.cancel();
    let summary = pipeline.run(&cancel)?;
    assert_eq!(summary.stop_reason, StopReason::Cancelled);
    assert_eq!(summary.frames_processed, 0);
    assert!(notifier.phrases().is_empty());
    assert!(pipeline.cooldown_state().is_empty());
    Ok(())
}

#[test]
fn human_is_repeated_only_after_cooldown() -> Result<()> {
    let notifier = RecordingNotifier::new();
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://crossing", 8, 8, Some(5))),
        Box::new(StubBackend::with_scenes(vec![vec![Detection::new(HUMAN, 0.9)]], 1)),
        policy(),
        Box::new(notifier.clone()),
        Box::new(NullOutput::new(None)),
    )
    .with_clock(Box::new(SteppingClock::new(1_000.0, 1.0)));
    pipeline.start()?;

    // Frames land at t = 1000..=1004; the 3 s cooldown needs a strictly larger gap.
    let summary = pipeline.run(&CancelToken::new())?;
    assert_eq!(summary.frames_processed, 5);
    assert_eq!(summary.alerts_spoken, 2);
    assert_eq!(
        notifier.phrases(),
        vec!["Warning. Human ahead", "Warning. Human ahead"]
    );
    assert_eq!(pipeline.cooldown_state().last_alert(HUMAN), 1_004.0);
    Ok(())
}

#[test]
fn vehicles_repeat_on_short_cooldown() -> Result<()> {
    let notifier = RecordingNotifier::new();
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://road", 8, 8, Some(4))),
        Box::new(StubBackend::with_scenes(
            vec![vec![Detection::new(CAR, 0.8), Detection::new(HUMAN, 0.2)]],
            1,
        )),
        policy(),
        Box::new(notifier.clone()),
        Box::new(NullOutput::new(None)),
    )
    .with_clock(Box::new(SteppingClock::new(50.0, 0.5)));
    pipeline.start()?;

    let summary = pipeline.run(&CancelToken::new())?;
    assert_eq!(summary.alerts_spoken, 4);
    assert!(notifier
        .phrases()
        .iter()
        .all(|phrase| phrase == "Warning. Car ahead"));
    assert!(!pipeline.cooldown_state().contains(HUMAN));
    Ok(())
}

#[test]
fn overlay_status_reaches_the_output() -> Result<()> {
    let output = StatusLog::default();
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://overlay", 8, 8, Some(3))),
        Box::new(StubBackend::new()),
        policy(),
        Box::new(RecordingNotifier::new()),
        Box::new(output.clone()),
    );
    pipeline.start()?;

    let summary = pipeline.run(&CancelToken::new())?;
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(*output.frames.lock().unwrap(), 3);
    let statuses = output.statuses.lock().unwrap().clone();
    assert_eq!(statuses.len(), 3);
    assert!(statuses
        .iter()
        .all(|status| status == "Object Detection | Network 30 FPS"));
    Ok(())
}

#[test]
fn speech_spawn_failure_ends_run() -> Result<()> {
    let notifier = SpeechNotifier::new(SpeechConfig {
        binary: "/nonexistent/hazard-callout-tts".to_string(),
        args: Vec::new(),
    });
    let mut pipeline = Pipeline::new(
        Box::new(SyntheticSource::new("stub://crossing", 8, 8, None)),
        Box::new(StubBackend::with_scenes(vec![vec![Detection::new(HUMAN, 0.9)]], 1)),
        policy(),
        Box::new(notifier),
        Box::new(NullOutput::new(None)),
    );
    pipeline.start()?;

    let err = pipeline
        .run(&CancelToken::new())
        .expect_err("missing speech binary must end the run");
    assert!(err.to_string().contains("speak warning"));
    assert!(format!("{:#}", err).contains("/nonexistent/hazard-callout-tts"));
    Ok(())
}
