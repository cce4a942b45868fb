use anyhow::Result;

use super::VideoOutput;
use crate::frame::Frame;

/// Output that discards frames and remembers the latest status line.
///
/// With a frame limit it stops streaming after that many renders, standing in for a
/// viewer closing its window.
#[derive(Debug, Default)]
pub struct NullOutput {
    frame_limit: Option<u64>,
    frames_rendered: u64,
    status: String,
}

impl NullOutput {
    pub fn new(frame_limit: Option<u64>) -> Self {
        Self {
            frame_limit,
            ..Self::default()
        }
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl VideoOutput for NullOutput {
    fn render(&mut self, _frame: &Frame) -> Result<()> {
        self.frames_rendered += 1;
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        if self.status != status {
            log::debug!("status: {}", status);
            self.status = status.to_string();
        }
    }

    fn is_streaming(&self) -> bool {
        self.frame_limit
            .map_or(true, |limit| self.frames_rendered < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_output_tracks_status_and_frames() -> Result<()> {
        let mut output = NullOutput::new(None);
        let frame = Frame::new(vec![0u8; 3], 1, 1, 1)?;
        output.render(&frame)?;
        output.render(&frame)?;
        output.set_status("Object Detection | Network 30 FPS");
        assert_eq!(output.frames_rendered(), 2);
        assert_eq!(output.status(), "Object Detection | Network 30 FPS");
        assert!(output.is_streaming());
        Ok(())
    }
}
