//! Detection loop.
//!
//! One synchronous loop: capture → detect → alert policy → (maybe) speak → render.
//! The loop checks a `CancelToken` at the top of every iteration and stops when the
//! source or the output stops streaming.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

use crate::detect::DetectorBackend;
use crate::ingest::VideoSource;
use crate::notify::Notifier;
use crate::policy::{AlertPolicy, CooldownState};
use crate::render::VideoOutput;

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Overlay text shown on every rendered frame.
pub fn overlay_status(network_fps: f32) -> String {
    format!("Object Detection | Network {:.0} FPS", network_fps)
}

/// Shared stop flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Wall-clock time in seconds since the Unix epoch.
pub trait Clock {
    fn now_epoch_s(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_s(&self) -> f64 {
        epoch_seconds(SystemTime::now())
    }
}

/// Seconds since the Unix epoch. A clock set before the epoch reads as 0, so no
/// class becomes eligible until the clock is corrected.
fn epoch_seconds(at: SystemTime) -> f64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs_f64(),
        Err(err) => {
            log::warn!(
                "system clock is {:?} before the Unix epoch; warnings are suppressed",
                err.duration()
            );
            0.0
        }
    }
}

/// Why the loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    SourceEnded,
    OutputClosed,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub alerts_spoken: u64,
    pub stop_reason: StopReason,
}

/// The collaborators and policy one detection loop runs with.
pub struct Pipeline {
    source: Box<dyn VideoSource>,
    detector: Box<dyn DetectorBackend>,
    policy: AlertPolicy,
    notifier: Box<dyn Notifier>,
    output: Box<dyn VideoOutput>,
    clock: Box<dyn Clock>,
    state: CooldownState,
}

impl Pipeline {
    pub fn new(
        source: Box<dyn VideoSource>,
        detector: Box<dyn DetectorBackend>,
        policy: AlertPolicy,
        notifier: Box<dyn Notifier>,
        output: Box<dyn VideoOutput>,
    ) -> Self {
        Self {
            source,
            detector,
            policy,
            notifier,
            output,
            clock: Box::new(SystemClock),
            state: CooldownState::new(),
        }
    }

    /// Replace the wall clock used for cooldowns.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cooldown state as of the last processed frame.
    pub fn cooldown_state(&self) -> &CooldownState {
        &self.state
    }

    /// Open the source and warm up the detector.
    pub fn start(&mut self) -> Result<()> {
        self.source.open().context("open video source")?;
        self.detector
            .warm_up()
            .with_context(|| format!("warm up network {}", self.detector.name()))?;
        Ok(())
    }

    /// Run until cancelled or a stream ends. Collaborator errors end the run.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<RunSummary> {
        let mut frames_processed = 0u64;
        let mut alerts_spoken = 0u64;
        let mut last_health_log = Instant::now();

        log::info!(
            "detecting with {} (threshold {:.2})",
            self.detector.name(),
            self.policy.threshold()
        );

        let stop_reason = loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            if let Some(frame) = self.source.capture().context("capture frame")? {
                let result = self
                    .detector
                    .detect(&frame)
                    .with_context(|| format!("detect on frame {}", frame.sequence))?;
                let now = self.clock.now_epoch_s();
                log::debug!(
                    "frame {}: {} detections ({:?} since capture)",
                    frame.sequence,
                    result.len(),
                    frame.age()
                );

                let evaluation = self.policy.evaluate(
                    std::mem::take(&mut self.state),
                    &result.detections,
                    now,
                );
                self.state = evaluation.state;

                if let Some(alert) = evaluation.alert {
                    log::info!("🔊 {}", alert.phrase);
                    self.notifier.speak(&alert.phrase).context("speak warning")?;
                    alerts_spoken += 1;
                }

                self.output.render(&frame).context("render frame")?;
                self.output.set_status(&overlay_status(self.detector.network_fps()));
                frames_processed += 1;
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "source={} frames={} network_fps={:.1} alerts={}",
                    stats.uri,
                    stats.frames_captured,
                    self.detector.network_fps(),
                    alerts_spoken
                );
                last_health_log = Instant::now();
            }

            if !self.source.is_streaming() {
                break StopReason::SourceEnded;
            }
            if !self.output.is_streaming() {
                break StopReason::OutputClosed;
            }
        };

        log::info!(
            "detection loop stopped ({:?}) after {} frames, {} alerts",
            stop_reason,
            frames_processed,
            alerts_spoken
        );

        Ok(RunSummary {
            frames_processed,
            alerts_spoken,
            stop_reason,
        })
    }
}
