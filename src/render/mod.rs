//! Video outputs.
//!
//! An output renders each processed frame and carries a one-line status overlay.
//! - `null://[?frames=N]` or `stub://…`: discard frames (testing, headless runs)
//! - `snapshot://<path>`: keep the latest frame as a JPEG on disk (feature: output-snapshot)
//! - `display://N`, `rtp://host:port`: GStreamer playback/streaming with a text overlay
//!   (feature: video-gstreamer)

#[cfg(feature = "video-gstreamer")]
mod gst;
mod null;
#[cfg(feature = "output-snapshot")]
mod snapshot;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::uri::StreamUri;

#[cfg(feature = "video-gstreamer")]
pub use gst::GstreamerOutput;
pub use null::NullOutput;
#[cfg(feature = "output-snapshot")]
pub use snapshot::SnapshotOutput;

/// Renders frames with a status overlay.
pub trait VideoOutput {
    fn render(&mut self, frame: &Frame) -> Result<()>;

    /// Replace the overlay text shown with subsequent frames.
    fn set_status(&mut self, status: &str);

    /// False once the viewer or stream has gone away.
    fn is_streaming(&self) -> bool;
}

/// Open the output named by `uri`.
pub fn open_output(uri: &str) -> Result<Box<dyn VideoOutput>> {
    let uri = StreamUri::parse(uri)?;
    match uri.scheme() {
        Some("null") | Some("stub") => Ok(Box::new(NullOutput::new(uri.param_u64("frames")?))),
        Some("snapshot") => open_snapshot(&uri),
        Some("display") | Some("rtp") => open_gstreamer(&uri),
        _ => Err(anyhow!("unsupported output '{}'", uri.as_str())),
    }
}

#[cfg(feature = "output-snapshot")]
fn open_snapshot(uri: &StreamUri) -> Result<Box<dyn VideoOutput>> {
    Ok(Box::new(SnapshotOutput::new(uri.location())?))
}

#[cfg(not(feature = "output-snapshot"))]
fn open_snapshot(uri: &StreamUri) -> Result<Box<dyn VideoOutput>> {
    Err(anyhow!(
        "output '{}' requires the output-snapshot feature",
        uri.as_str()
    ))
}

#[cfg(feature = "video-gstreamer")]
fn open_gstreamer(uri: &StreamUri) -> Result<Box<dyn VideoOutput>> {
    Ok(Box::new(GstreamerOutput::new(uri)?))
}

#[cfg(not(feature = "video-gstreamer"))]
fn open_gstreamer(uri: &StreamUri) -> Result<Box<dyn VideoOutput>> {
    Err(anyhow!(
        "output '{}' requires the video-gstreamer feature",
        uri.as_str()
    ))
}
