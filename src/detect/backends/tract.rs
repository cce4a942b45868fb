#![cfg(feature = "backend-tract")]

use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, DetectionResult};
use crate::detect::throughput::ThroughputMeter;
use crate::frame::{Frame, RGB_CHANNELS};

const OUTPUT_BOXES: &str = "detection_boxes";
const OUTPUT_CLASSES: &str = "detection_classes";
const OUTPUT_SCORES: &str = "detection_scores";
const OUTPUT_COUNT: &str = "num_detections";

/// Positions of the four SSD outputs in the runnable plan.
#[derive(Clone, Copy, Debug)]
struct SsdOutputs {
    boxes: usize,
    classes: usize,
    scores: usize,
    count: usize,
}

/// Tract-based backend for SSD detection networks exported to ONNX.
///
/// Expects the TensorFlow object-detection signature: a `uint8` NHWC image input and
/// `detection_boxes` / `detection_classes` / `detection_scores` / `num_detections` outputs.
/// Frames are resized to the model input with nearest-neighbour sampling.
pub struct TractBackend {
    name: String,
    model: TypedRunnableModel<TypedModel>,
    outputs: SsdOutputs,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    meter: ThroughputMeter,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(name: &str, model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    u8::datum_type(),
                    tvec!(1, height as usize, width as usize, RGB_CHANNELS),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?;

        let output_names = model
            .output_outlets()
            .context("failed to read model outputs")?
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .map(str::to_string)
                    .unwrap_or_else(|| model.node(outlet.node).name.clone())
            })
            .collect::<Vec<_>>();
        let outputs = locate_outputs(&output_names)?;

        let model = model
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            name: name.to_string(),
            model,
            outputs,
            width,
            height,
            confidence_threshold: 0.0,
            meter: ThroughputMeter::new(),
        })
    }

    /// Drop detections below `threshold` before they leave the backend.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let src_w = frame.width as usize;
        let src_h = frame.height as usize;
        let dst_w = self.width as usize;
        let dst_h = self.height as usize;
        let pixels = frame.pixels();

        let input = tract_ndarray::Array4::from_shape_fn(
            (1, dst_h, dst_w, RGB_CHANNELS),
            |(_, y, x, channel)| {
                let sy = y * src_h / dst_h;
                let sx = x * src_w / dst_w;
                pixels[(sy * src_w + sx) * RGB_CHANNELS + channel]
            },
        );

        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let tensor = |index: usize| {
            outputs
                .get(index)
                .ok_or_else(|| anyhow!("model produced no output #{}", index))
        };
        let boxes = tensor(self.outputs.boxes)?
            .to_array_view::<f32>()
            .context("detection_boxes tensor was not f32")?;
        let classes = tensor(self.outputs.classes)?
            .to_array_view::<f32>()
            .context("detection_classes tensor was not f32")?;
        let scores = tensor(self.outputs.scores)?
            .to_array_view::<f32>()
            .context("detection_scores tensor was not f32")?;
        let count = tensor(self.outputs.count)?
            .to_array_view::<f32>()
            .context("num_detections tensor was not f32")?;

        let boxes = boxes.as_slice().context("detection_boxes not contiguous")?;
        let classes = classes.as_slice().context("detection_classes not contiguous")?;
        let scores = scores.as_slice().context("detection_scores not contiguous")?;
        let reported = count.iter().next().copied().unwrap_or(0.0).max(0.0) as usize;
        let count = reported
            .min(classes.len())
            .min(scores.len())
            .min(boxes.len() / 4);

        let mut detections = Vec::with_capacity(count);
        for i in 0..count {
            let confidence = scores[i];
            if confidence < self.confidence_threshold {
                continue;
            }
            let [ymin, xmin, ymax, xmax] = [
                boxes[i * 4],
                boxes[i * 4 + 1],
                boxes[i * 4 + 2],
                boxes[i * 4 + 3],
            ];
            detections.push(
                Detection::new(classes[i].round().max(0.0) as u32, confidence).with_bbox(
                    xmin,
                    ymin,
                    (xmax - xmin).max(0.0),
                    (ymax - ymin).max(0.0),
                ),
            );
        }
        Ok(detections)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&mut self, frame: &Frame) -> Result<DetectionResult> {
        if frame.width == 0 || frame.height == 0 {
            return Err(anyhow!("cannot run detection on an empty frame"));
        }
        let started = Instant::now();
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let detections = self.decode(outputs)?;
        self.meter.record(started.elapsed());

        Ok(DetectionResult::new(detections))
    }

    fn network_fps(&self) -> f32 {
        self.meter.fps()
    }
}

fn locate_outputs(names: &[String]) -> Result<SsdOutputs> {
    let find = |wanted: &str| {
        names
            .iter()
            .position(|name| name.contains(wanted))
            .ok_or_else(|| anyhow!("model has no '{}' output (outputs: {:?})", wanted, names))
    };
    Ok(SsdOutputs {
        boxes: find(OUTPUT_BOXES)?,
        classes: find(OUTPUT_CLASSES)?,
        scores: find(OUTPUT_SCORES)?,
        count: find(OUTPUT_COUNT)?,
    })
}
