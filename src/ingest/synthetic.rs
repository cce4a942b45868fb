//! Synthetic frame source (`stub://`).
//!
//! Generates patterned RGB frames without any device. With `?frames=N` the stream
//! ends after `N` frames, which is how tests exercise end-of-stream handling.

use anyhow::Result;

use super::{CaptureSettings, SourceStats, VideoSource};
use crate::frame::{expected_len, Frame};
use crate::uri::StreamUri;

pub struct SyntheticSource {
    uri: String,
    width: u32,
    height: u32,
    frame_limit: Option<u64>,
    frame_count: u64,
    /// Simulated "scene" state so consecutive frames differ.
    scene_state: u8,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(uri: &str, width: u32, height: u32, frame_limit: Option<u64>) -> Self {
        Self {
            uri: uri.to_string(),
            width,
            height,
            frame_limit,
            frame_count: 0,
            scene_state: 0,
            opened: false,
        }
    }

    pub fn from_uri(uri: &StreamUri, settings: &CaptureSettings) -> Result<Self> {
        let width = uri.param_u32("width")?.unwrap_or(settings.width);
        let height = uri.param_u32("height")?.unwrap_or(settings.height);
        Ok(Self::new(
            uri.as_str(),
            width,
            height,
            uri.param_u64("frames")?,
        ))
    }

    fn exhausted(&self) -> bool {
        self.frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
    }

    fn generate_synthetic_pixels(&mut self) -> Result<Vec<u8>> {
        let pixel_count = expected_len(self.width, self.height)?;

        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }

        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        Ok(pixels)
    }
}

impl VideoSource for SyntheticSource {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        log::info!(
            "SyntheticSource: streaming {} ({}x{})",
            self.uri,
            self.width,
            self.height
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        if self.exhausted() {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels()?;
        Frame::new(pixels, self.width, self.height, self.frame_count).map(Some)
    }

    fn is_streaming(&self) -> bool {
        self.opened && !self.exhausted()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}
