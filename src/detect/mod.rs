mod backend;
mod backends;
pub mod labels;
mod registry;
mod result;
mod throughput;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::LabelTable;
pub use registry::{NetworkRegistry, NetworkSpec};
pub use result::{Detection, DetectionResult};
pub use throughput::ThroughputMeter;
