//! Registration of pretrained upstream feature extractors.
//!
//! An upstream is looked up by name and built from a checkpoint reference and
//! a model-config mapping. The registry holds factories only; what an
//! upstream computes is up to the registered implementation.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::DatasetError;

/// Name under which a user-supplied upstream is registered.
pub const CUSTOMIZED_UPSTREAM: &str = "customized_upstream";

pub trait UpstreamExpert: Send + Sync {
    /// One `[frames][dim]` feature matrix per input waveform.
    fn extract(&self, wavs: &[Vec<f32>]) -> Result<Vec<Vec<Vec<f32>>>, DatasetError>;

    /// Input samples per output frame.
    fn downsample_rate(&self) -> usize;
}

pub type UpstreamFactory = Box<
    dyn Fn(&Path, &Value) -> Result<Box<dyn UpstreamExpert>, DatasetError> + Send + Sync,
>;

#[derive(Default)]
pub struct UpstreamRegistry {
    factories: BTreeMap<String, UpstreamFactory>,
}

impl UpstreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names with a leading `_` are private and cannot be registered.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: UpstreamFactory,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if name.is_empty() || name.starts_with('_') {
            return Err(DatasetError::upstream(name, "not a public upstream name"));
        }
        if self.factories.insert(name.clone(), factory).is_some() {
            tracing::warn!(name = name.as_str(), "upstream: replaced existing registration");
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(
        &self,
        name: &str,
        ckpt: &Path,
        model_config: &Value,
    ) -> Result<Box<dyn UpstreamExpert>, DatasetError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DatasetError::upstream(name, "not registered"))?;
        tracing::info!(name, ckpt = %ckpt.display(), "upstream: building");
        factory(ckpt, model_config)
    }
}

/// Builds the upstream registered as [`CUSTOMIZED_UPSTREAM`].
pub fn customized_upstream(
    registry: &UpstreamRegistry,
    ckpt: &Path,
    model_config: &Value,
) -> Result<Box<dyn UpstreamExpert>, DatasetError> {
    registry.build(CUSTOMIZED_UPSTREAM, ckpt, model_config)
}
