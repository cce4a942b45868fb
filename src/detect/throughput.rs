use std::time::Duration;

/// Smoothing factor for the moving average of inference time.
const SMOOTHING: f64 = 0.2;

/// Tracks network throughput as an exponential moving average of inference time.
#[derive(Clone, Debug, Default)]
pub struct ThroughputMeter {
    avg_secs: Option<f64>,
    samples: u64,
}

impl ThroughputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the wall time of one inference pass.
    pub fn record(&mut self, elapsed: Duration) {
        let secs = elapsed.as_secs_f64();
        self.avg_secs = Some(match self.avg_secs {
            Some(avg) => avg + SMOOTHING * (secs - avg),
            None => secs,
        });
        self.samples += 1;
    }

    /// Frames per second implied by the average inference time, 0 before any sample.
    pub fn fps(&self) -> f32 {
        match self.avg_secs {
            Some(avg) if avg > 0.0 => (1.0 / avg) as f32,
            _ => 0.0,
        }
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}
