//! JPEG snapshot output.
//!
//! Overwrites one image file with the most recent frame, throttled to one write per
//! second. The status line goes to the log since the image carries no text layer.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};

use super::VideoOutput;
use crate::frame::Frame;

const WRITE_INTERVAL: Duration = Duration::from_secs(1);

pub struct SnapshotOutput {
    path: PathBuf,
    last_write: Option<Instant>,
    status: String,
}

impl SnapshotOutput {
    pub fn new(path: &str) -> Result<Self> {
        if path.trim().is_empty() {
            return Err(anyhow!(
                "snapshot output needs a file path (snapshot:///path.jpg)"
            ));
        }
        Ok(Self {
            path: PathBuf::from(path),
            last_write: None,
            status: String::new(),
        })
    }

    fn write(&self, frame: &Frame) -> Result<()> {
        let image =
            image::RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
                .ok_or_else(|| {
                    anyhow!("frame buffer does not match {}x{}", frame.width, frame.height)
                })?;
        image
            .save_with_format(&self.path, image::ImageFormat::Jpeg)
            .with_context(|| format!("write snapshot to {}", self.path.display()))
    }
}

impl VideoOutput for SnapshotOutput {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        if self
            .last_write
            .is_some_and(|at| at.elapsed() < WRITE_INTERVAL)
        {
            return Ok(());
        }
        self.write(frame)?;
        self.last_write = Some(Instant::now());
        log::debug!("snapshot {} ({})", self.path.display(), self.status);
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
    }

    fn is_streaming(&self) -> bool {
        true
    }
}
