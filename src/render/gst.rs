//! GStreamer video output.
//!
//! Frames are pushed into an `appsrc`, pass a `textoverlay` that draws the status
//! line, and end in a display or RTP sink:
//! - `display://N` → `autovideosink`
//! - `rtp://host:port` → H.264 over RTP/UDP

use anyhow::{anyhow, Context, Result};
use gstreamer::prelude::*;

use super::VideoOutput;
use crate::frame::Frame;
use crate::uri::StreamUri;

const OUTPUT_FPS: i32 = 30;

pub struct GstreamerOutput {
    uri: String,
    pipeline: gstreamer::Pipeline,
    appsrc: gstreamer_app::AppSrc,
    overlay: gstreamer::Element,
    /// Caps currently negotiated on the appsrc, as (width, height).
    geometry: Option<(u32, u32)>,
    closed: bool,
}

impl GstreamerOutput {
    pub fn new(uri: &StreamUri) -> Result<Self> {
        gstreamer::init().context("initialize gstreamer")?;

        let description = pipeline_description(uri)?;
        log::debug!("GstreamerOutput pipeline: {}", description);

        let pipeline = gstreamer::parse::launch(&description)
            .with_context(|| format!("build output pipeline for {}", uri))?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| anyhow!("output pipeline is not a Pipeline"))?;

        let appsrc = pipeline
            .by_name("src")
            .context("appsrc element missing from pipeline")?
            .downcast::<gstreamer_app::AppSrc>()
            .map_err(|_| anyhow!("appsrc element has unexpected type"))?;
        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_property("do-timestamp", true);

        let overlay = pipeline
            .by_name("overlay")
            .context("textoverlay element missing from pipeline")?;

        pipeline
            .set_state(gstreamer::State::Playing)
            .with_context(|| format!("start output pipeline for {}", uri))?;
        log::info!("GstreamerOutput: rendering to {}", uri);

        Ok(Self {
            uri: uri.as_str().to_string(),
            pipeline,
            appsrc,
            overlay,
            geometry: None,
            closed: false,
        })
    }

    fn ensure_caps(&mut self, width: u32, height: u32) -> Result<()> {
        if self.geometry == Some((width, height)) {
            return Ok(());
        }
        let caps = gstreamer_video::VideoInfo::builder(
            gstreamer_video::VideoFormat::Rgb,
            width,
            height,
        )
        .fps(gstreamer::Fraction::new(OUTPUT_FPS, 1))
        .build()
        .context("describe output video format")?
        .to_caps()
        .context("build output caps")?;
        self.appsrc.set_caps(Some(&caps));
        self.geometry = Some((width, height));
        Ok(())
    }

    fn poll_bus(&mut self) -> Result<()> {
        let Some(bus) = self.pipeline.bus() else {
            return Ok(());
        };
        while let Some(message) = bus.timed_pop(gstreamer::ClockTime::ZERO) {
            use gstreamer::MessageView;
            match message.view() {
                MessageView::Error(err) => {
                    self.closed = true;
                    return Err(anyhow!(
                        "output {} failed: gstreamer error from {:?}: {}",
                        self.uri,
                        err.src().map(|s| s.path_string()),
                        err.error()
                    ));
                }
                MessageView::Eos(..) => {
                    self.closed = true;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl VideoOutput for GstreamerOutput {
    fn render(&mut self, frame: &Frame) -> Result<()> {
        self.poll_bus()?;
        if self.closed {
            return Ok(());
        }
        self.ensure_caps(frame.width, frame.height)?;

        let buffer = gstreamer::Buffer::from_mut_slice(frame.pixels().to_vec());
        if let Err(err) = self.appsrc.push_buffer(buffer) {
            if err == gstreamer::FlowError::Flushing || err == gstreamer::FlowError::Eos {
                self.closed = true;
                return Ok(());
            }
            return Err(anyhow!("push frame to {} failed: {:?}", self.uri, err));
        }
        Ok(())
    }

    fn set_status(&mut self, status: &str) {
        self.overlay.set_property("text", status);
    }

    fn is_streaming(&self) -> bool {
        !self.closed
    }
}

impl Drop for GstreamerOutput {
    fn drop(&mut self) {
        let _ = self.appsrc.end_of_stream();
        if let Err(err) = self.pipeline.set_state(gstreamer::State::Null) {
            log::warn!("GstreamerOutput: failed to stop {}: {}", self.uri, err);
        }
    }
}

fn pipeline_description(uri: &StreamUri) -> Result<String> {
    let head = "appsrc name=src ! videoconvert ! \
                textoverlay name=overlay valignment=top halignment=left \
                font-desc=\"Sans, 18\" shaded-background=true ! videoconvert";
    match uri.scheme() {
        Some("display") => Ok(format!("{} ! autovideosink sync=false", head)),
        Some("rtp") => {
            let (host, port) = uri
                .location()
                .rsplit_once(':')
                .ok_or_else(|| anyhow!("rtp output must be rtp://host:port, got {}", uri))?;
            let port: u16 = port
                .parse()
                .map_err(|_| anyhow!("invalid rtp port in {}", uri))?;
            Ok(format!(
                "{} ! x264enc tune=zerolatency speed-preset=ultrafast ! rtph264pay ! \
                 udpsink host={} port={}",
                head, host, port
            ))
        }
        _ => Err(anyhow!("no output pipeline for {}", uri)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pipeline_has_overlay_and_sink() -> Result<()> {
        let description = pipeline_description(&StreamUri::parse("display://0")?)?;
        assert!(description.contains("textoverlay name=overlay"));
        assert!(description.ends_with("autovideosink sync=false"));
        Ok(())
    }

    #[test]
    fn rtp_pipeline_requires_port() -> Result<()> {
        let description = pipeline_description(&StreamUri::parse("rtp://192.168.1.20:5000")?)?;
        assert!(description.contains("udpsink host=192.168.1.20 port=5000"));
        assert!(pipeline_description(&StreamUri::parse("rtp://192.168.1.20")?).is_err());
        Ok(())
    }
}
