//! Hazard callout
//!
//! Watches a camera feed with an object detection network and speaks a short warning
//! when pedestrians, vehicles or animals come into view.
//!
//! # Architecture
//!
//! One synchronous loop ties five pieces together:
//!
//! 1. **Video source** (`ingest`): produces RGB frames.
//! 2. **Detector** (`detect`): maps a frame to class/confidence/box records.
//! 3. **Alert policy** (`policy`): decides per frame whether to speak, with a
//!    per-class cooldown.
//! 4. **Notifier** (`notify`): speaks the phrase through a detached process.
//! 5. **Video output** (`render`): shows the frame with a throughput overlay.
//!
//! # Module Structure
//!
//! - `frame`: captured frame type
//! - `runtime`: the loop, its cancellation token and clock
//! - `config`: file + environment configuration

pub mod config;
pub mod detect;
pub mod frame;
pub mod ingest;
pub mod notify;
pub mod policy;
pub mod render;
pub mod runtime;
pub mod uri;

pub use config::{AnnounceConfig, ModelSettings};
pub use detect::{
    Detection, DetectionResult, DetectorBackend, LabelTable, NetworkRegistry, NetworkSpec,
    StubBackend,
};
pub use frame::Frame;
pub use ingest::{open_source, CaptureSettings, SourceStats, SyntheticSource, VideoSource};
pub use notify::{LogNotifier, Notifier, RecordingNotifier, SpeechConfig, SpeechNotifier};
pub use policy::{
    warning_phrase, Alert, AlertPolicy, CooldownPolicy, CooldownState, Evaluation,
};
pub use render::{open_output, NullOutput, VideoOutput};
pub use runtime::{
    overlay_status, CancelToken, Clock, Pipeline, RunSummary, StopReason, SystemClock,
};
