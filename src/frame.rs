//! Captured video frames.
//!
//! - `Frame`: RGB24 pixel buffer handed from a `VideoSource` to the detector and the output.
//!
//! Frames are transient. The loop owns exactly one at a time and drops it after rendering.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

/// Bytes per pixel for the packed RGB layout every source produces.
pub const RGB_CHANNELS: usize = 3;

/// One captured frame in packed RGB24 layout (row-major, no padding).
pub struct Frame {
    data: Vec<u8>,

    pub width: u32,
    pub height: u32,

    /// Capture sequence number, starting at 1 for each source.
    pub sequence: u64,

    /// Monotonic capture instant, used for latency logging.
    capture_instant: Instant,
}

impl Frame {
    /// Wrap a packed RGB buffer. The buffer length must match `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = expected_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
            capture_instant: Instant::now(),
        })
    }

    /// Packed RGB pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Time since capture.
    pub fn age(&self) -> Duration {
        self.capture_instant.elapsed()
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Consume the frame, returning its pixel buffer.
    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }
}

/// Byte length of a packed RGB frame of the given size.
pub fn expected_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
