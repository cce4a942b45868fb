use anyhow::Result;

use crate::detect::result::DetectionResult;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one detection network. It receives whole frames and returns
/// class/confidence/geometry records; network internals stay behind this boundary.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult>;

    /// Current network throughput in frames per second.
    fn network_fps(&self) -> f32;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
