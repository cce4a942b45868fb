use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;
use super::backends::StubBackend;

/// Everything a factory needs to open a named network.
#[derive(Clone, Debug)]
pub struct NetworkSpec {
    /// Network name as given on the command line (e.g. "ssd-mobilenet-v2").
    pub name: String,
    /// Directory holding `<name>.onnx` model files.
    pub models_dir: PathBuf,
    /// Model input width in pixels.
    pub input_width: u32,
    /// Model input height in pixels.
    pub input_height: u32,
    /// Minimum confidence the backend reports.
    pub threshold: f32,
}

impl NetworkSpec {
    /// On-disk location of the ONNX model for this network.
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(format!("{}.onnx", self.name))
    }
}

type Factory = Box<dyn Fn(&NetworkSpec) -> Result<Box<dyn DetectorBackend>>>;

/// Registry of detector factories keyed by network name.
///
/// Names without a dedicated factory fall through to the ONNX loader.
pub struct NetworkRegistry {
    factories: BTreeMap<String, Factory>,
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `stub` network.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("stub", |_| Ok(Box::new(StubBackend::new())));
        registry
    }

    /// Register a factory. A later registration under the same name replaces the earlier one.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&NetworkSpec) -> Result<Box<dyn DetectorBackend>> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    /// List registered network names.
    pub fn list(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Open the network named in `spec`.
    ///
    /// `stub://anything` resolves to the `stub` factory.
    pub fn open(&self, spec: &NetworkSpec) -> Result<Box<dyn DetectorBackend>> {
        let key = if spec.name.starts_with("stub://") {
            "stub"
        } else {
            spec.name.as_str()
        };
        if let Some(factory) = self.factories.get(key) {
            return factory(spec);
        }
        open_onnx(spec)
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(feature = "backend-tract")]
fn open_onnx(spec: &NetworkSpec) -> Result<Box<dyn DetectorBackend>> {
    let path = spec.model_path();
    if !path.is_file() {
        return Err(anyhow!(
            "network '{}' not found: no model at {}",
            spec.name,
            path.display()
        ));
    }
    let backend =
        super::backends::TractBackend::new(&spec.name, &path, spec.input_width, spec.input_height)?
            .with_threshold(spec.threshold);
    log::info!("loaded network {} from {}", spec.name, path.display());
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn open_onnx(spec: &NetworkSpec) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "network '{}' requires the backend-tract feature (model path {})",
        spec.name,
        spec.model_path().display()
    ))
}
