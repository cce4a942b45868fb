//! GStreamer frame source.
//!
//! Builds a decode pipeline ending in an RGB `appsink` for:
//! - `rtsp://` / `rtsps://` IP cameras
//! - `file://` local video files
//! - `csi://N` Jetson CSI cameras (nvarguscamerasrc)
//!
//! End-of-stream stops streaming; bus errors are returned from `capture`.

use anyhow::{anyhow, Context, Result};
use gstreamer::prelude::*;

use super::{CaptureSettings, SourceStats, VideoSource};
use crate::frame::Frame;
use crate::uri::StreamUri;

const APPSINK_CAPS: &str = "video/x-raw,format=RGB";

pub struct GstreamerSource {
    uri: String,
    settings: CaptureSettings,
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    frame_count: u64,
    playing: bool,
    eos: bool,
    last_error: Option<String>,
}

impl GstreamerSource {
    pub fn new(uri: &StreamUri, settings: &CaptureSettings) -> Result<Self> {
        gstreamer::init().context("initialize gstreamer")?;

        let description = pipeline_description(uri, settings)?;
        log::debug!("GstreamerSource pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .with_context(|| format!("build capture pipeline for {}", uri))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow!("capture pipeline is not a Pipeline"))?;

        let appsink = pipeline
            .by_name("appsink")
            .context("appsink element missing from pipeline")?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| anyhow!("appsink element has unexpected type"))?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", "RGB")
            .build();
        appsink.set_caps(Some(&caps));

        Ok(Self {
            uri: uri.as_str().to_string(),
            settings: settings.clone(),
            pipeline,
            appsink,
            frame_count: 0,
            playing: false,
            eos: false,
            last_error: None,
        })
    }

    fn frame_timeout(&self) -> gstreamer::ClockTime {
        let base_ms = if self.settings.target_fps == 0 {
            500
        } else {
            (1000 / self.settings.target_fps).saturating_mul(4)
        };
        gstreamer::ClockTime::from_mseconds(base_ms.max(500) as u64)
    }

    fn poll_bus(&mut self) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        while let Some(message) = bus.timed_pop(gstreamer::ClockTime::ZERO) {
            use gstreamer::MessageView;
            match message.view() {
                MessageView::Error(err) => {
                    self.last_error = Some(format!(
                        "gstreamer error from {:?}: {}",
                        err.src().map(|s| s.path_string()),
                        err.error()
                    ));
                }
                MessageView::Eos(..) => {
                    self.eos = true;
                }
                _ => {}
            }
        }
    }
}

impl VideoSource for GstreamerSource {
    fn open(&mut self) -> Result<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .with_context(|| format!("start capture pipeline for {}", self.uri))?;
        self.playing = true;
        log::info!("GstreamerSource: streaming {}", self.uri);
        Ok(())
    }

    fn capture(&mut self) -> Result<Option<Frame>> {
        self.poll_bus();
        if let Some(err) = &self.last_error {
            return Err(anyhow!("capture from {} failed: {}", self.uri, err));
        }
        if self.eos {
            return Ok(None);
        }

        let Some(sample) = self.appsink.try_pull_sample(self.frame_timeout()) else {
            if self.appsink.is_eos() {
                self.eos = true;
            } else {
                log::debug!("GstreamerSource: no frame from {} before timeout", self.uri);
            }
            return Ok(None);
        };

        let (pixels, width, height) = sample_to_pixels(&sample)?;
        self.frame_count += 1;
        Frame::new(pixels, width, height, self.frame_count).map(Some)
    }

    fn is_streaming(&self) -> bool {
        self.playing && !self.eos && self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            uri: self.uri.clone(),
        }
    }
}

impl Drop for GstreamerSource {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("GstreamerSource: failed to stop {}: {}", self.uri, err);
        }
    }
}

fn pipeline_description(uri: &StreamUri, settings: &CaptureSettings) -> Result<String> {
    let sink = format!(
        "videoconvert ! videoscale ! {},width={},height={} ! \
         appsink name=appsink sync=false max-buffers=1",
        APPSINK_CAPS, settings.width, settings.height
    );
    match uri.scheme() {
        Some("rtsp") | Some("rtsps") => Ok(format!(
            "rtspsrc location={} latency=0 ! decodebin ! {} drop=true",
            uri.as_str(),
            sink
        )),
        Some("file") => Ok(format!(
            "filesrc location=\"{}\" ! decodebin ! {} drop=false",
            uri.location(),
            sink
        )),
        Some("csi") => {
            let sensor: u32 = uri
                .location()
                .parse()
                .map_err(|_| anyhow!("csi input must be csi://<sensor-id>, got {}", uri))?;
            Ok(format!(
                "nvarguscamerasrc sensor-id={} ! \
                 video/x-raw(memory:NVMM),width={},height={},framerate={}/1 ! \
                 nvvidconv ! video/x-raw,format=BGRx ! {} drop=true",
                sensor, settings.width, settings.height, settings.target_fps, sink
            ))
        }
        _ => Err(anyhow!("no capture pipeline for {}", uri)),
    }
}

fn sample_to_pixels(sample: &gstreamer::Sample) -> Result<(Vec<u8>, u32, u32)> {
    let buffer = sample.buffer().context("capture sample missing buffer")?;
    let caps = sample.caps().context("capture sample missing caps")?;
    let info =
        gstreamer_video::VideoInfo::from_caps(caps).context("parse capture caps as video info")?;

    let width = info.width();
    let height = info.height();
    let row_bytes = (width as usize) * 3;
    let stride = info.stride()[0] as usize;

    let map = buffer.map_readable().context("map capture buffer")?;
    let data = map.as_slice();

    if stride == row_bytes {
        let pixels = data
            .get(..row_bytes * height as usize)
            .context("capture buffer too short")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("capture buffer row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtsp_pipeline_uses_rtspsrc() -> Result<()> {
        let uri = StreamUri::parse("rtsp://10.0.0.5/stream")?;
        let description = pipeline_description(&uri, &CaptureSettings::default())?;
        assert!(description.starts_with("rtspsrc location=rtsp://10.0.0.5/stream"));
        assert!(description.contains("width=640,height=480"));
        Ok(())
    }

    #[test]
    fn file_pipeline_gets_decoded_path() -> Result<()> {
        let uri = StreamUri::parse("file:///home/u/My%20Video.mp4")?;
        let description = pipeline_description(&uri, &CaptureSettings::default())?;
        assert!(description.starts_with("filesrc location=\"/home/u/My Video.mp4\""));
        Ok(())
    }

    #[test]
    fn csi_pipeline_requires_numeric_sensor() -> Result<()> {
        let uri = StreamUri::parse("csi://0")?;
        let description = pipeline_description(&uri, &CaptureSettings::default())?;
        assert!(description.contains("sensor-id=0"));
        let named = StreamUri::parse("csi://left")?;
        assert!(pipeline_description(&named, &CaptureSettings::default()).is_err());
        Ok(())
    }
}
