//! Frame ingestion sources.
//!
//! This module provides different sources for camera frames:
//! - Synthetic source, `stub://name[?frames=N]` (testing, always available)
//! - USB/V4L2 devices, `/dev/videoN` or `v4l2:///dev/videoN` (feature: ingest-v4l2)
//! - RTSP streams, local files and CSI cameras, `rtsp://`, `file://`, `csi://N`
//!   (feature: video-gstreamer)
//!
//! All sources produce packed RGB `Frame`s. A source stops streaming at end of stream;
//! after that `capture` returns `Ok(None)`.

#[cfg(feature = "video-gstreamer")]
mod gst;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::uri::StreamUri;

#[cfg(feature = "video-gstreamer")]
pub use gst::GstreamerSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// Frame geometry and rate requested from capture devices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 30,
        }
    }
}

/// Statistics for a video source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub uri: String,
}

/// A camera or stream producing frames on demand.
pub trait VideoSource {
    /// Start streaming.
    fn open(&mut self) -> Result<()>;

    /// Capture the next frame. Blocks until one is available.
    ///
    /// Returns `Ok(None)` when no frame arrived (timeout or end of stream).
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// False once the stream has ended.
    fn is_streaming(&self) -> bool;

    fn stats(&self) -> SourceStats;
}

/// Open the source named by `uri`.
pub fn open_source(uri: &str, settings: &CaptureSettings) -> Result<Box<dyn VideoSource>> {
    let uri = StreamUri::parse(uri)?;
    match uri.scheme() {
        Some("stub") => Ok(Box::new(SyntheticSource::from_uri(&uri, settings)?)),
        Some("v4l2") | None => open_v4l2(&uri, settings),
        Some("rtsp") | Some("rtsps") | Some("file") | Some("csi") => open_gstreamer(&uri, settings),
        Some(other) => Err(anyhow!(
            "unsupported input scheme '{}' in {}",
            other,
            uri.as_str()
        )),
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_v4l2(uri: &StreamUri, settings: &CaptureSettings) -> Result<Box<dyn VideoSource>> {
    let device = uri.location();
    if !device.starts_with("/dev/") {
        return Err(anyhow!("unsupported input '{}': expected /dev/videoN", uri));
    }
    Ok(Box::new(V4l2Source::new(V4l2Config {
        device: device.to_string(),
        target_fps: settings.target_fps,
        width: settings.width,
        height: settings.height,
    })))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_v4l2(uri: &StreamUri, _settings: &CaptureSettings) -> Result<Box<dyn VideoSource>> {
    Err(anyhow!(
        "input '{}' requires the ingest-v4l2 feature",
        uri.as_str()
    ))
}

#[cfg(feature = "video-gstreamer")]
fn open_gstreamer(uri: &StreamUri, settings: &CaptureSettings) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(GstreamerSource::new(uri, settings)?))
}

#[cfg(not(feature = "video-gstreamer"))]
fn open_gstreamer(uri: &StreamUri, _settings: &CaptureSettings) -> Result<Box<dyn VideoSource>> {
    Err(anyhow!(
        "input '{}' requires the video-gstreamer feature",
        uri.as_str()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_uri_opens_synthetic_source() -> Result<()> {
        let mut source = open_source("stub://front?frames=2", &CaptureSettings::default())?;
        source.open()?;
        assert!(source.capture()?.is_some());
        assert!(source.capture()?.is_some());
        assert!(source.capture()?.is_none());
        assert!(!source.is_streaming());
        assert_eq!(source.stats().frames_captured, 2);
        Ok(())
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let err = match open_source("gopher://camera", &CaptureSettings::default()) {
            Ok(_) => panic!("expected unsupported scheme"),
            Err(err) => err,
        };
        assert!(err.to_string().contains("gopher"));
    }
}
