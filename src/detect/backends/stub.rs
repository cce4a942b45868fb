use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::labels::{BICYCLE, CAR, CAT, DOG, HUMAN, TRUCK};
use crate::detect::result::{Detection, DetectionResult};
use crate::frame::Frame;

/// Throughput the stub reports; it does no real inference.
const STUB_NETWORK_FPS: f32 = 30.0;

/// Frames each built-in scene stays on screen.
const DEFAULT_FRAMES_PER_SCENE: u64 = 15;

/// Stub backend for testing. Replays a fixed script of scenes, one detection list per scene.
pub struct StubBackend {
    scenes: Vec<Vec<Detection>>,
    frames_per_scene: u64,
    calls: u64,
}

impl StubBackend {
    /// Built-in street script: empty road, pedestrian, cyclist beside a car,
    /// a dog with a low-confidence person, a truck passing a cat.
    pub fn new() -> Self {
        Self::with_scenes(
            vec![
                vec![],
                vec![Detection::new(HUMAN, 0.91).with_bbox(0.40, 0.30, 0.12, 0.45)],
                vec![
                    Detection::new(CAR, 0.83).with_bbox(0.10, 0.50, 0.35, 0.25),
                    Detection::new(BICYCLE, 0.72).with_bbox(0.60, 0.55, 0.15, 0.20),
                ],
                vec![
                    Detection::new(DOG, 0.77).with_bbox(0.30, 0.70, 0.10, 0.10),
                    Detection::new(HUMAN, 0.41).with_bbox(0.70, 0.30, 0.10, 0.40),
                ],
                vec![
                    Detection::new(TRUCK, 0.66).with_bbox(0.05, 0.35, 0.50, 0.40),
                    Detection::new(CAT, 0.88).with_bbox(0.80, 0.80, 0.08, 0.08),
                ],
            ],
            DEFAULT_FRAMES_PER_SCENE,
        )
    }

    /// Replay `scenes` in order, each for `frames_per_scene` frames, looping at the end.
    pub fn with_scenes(scenes: Vec<Vec<Detection>>, frames_per_scene: u64) -> Self {
        Self {
            scenes,
            frames_per_scene: frames_per_scene.max(1),
            calls: 0,
        }
    }

    fn current_scene(&self) -> Vec<Detection> {
        if self.scenes.is_empty() {
            return Vec::new();
        }
        let index = (self.calls / self.frames_per_scene) as usize % self.scenes.len();
        self.scenes[index].clone()
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<DetectionResult> {
        let detections = self.current_scene();
        self.calls += 1;
        Ok(DetectionResult::new(detections))
    }

    fn network_fps(&self) -> f32 {
        STUB_NETWORK_FPS
    }
}
