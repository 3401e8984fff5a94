use crate::error::ApiError;
use model_registry::{LoadedModel, Predictor};
use std::fmt;
use std::sync::Arc;

/// Shared, read-only reference to the loaded model. Empty until startup
/// populates it.
#[derive(Clone, Default)]
pub struct ModelHandle {
    predictor: Option<Arc<dyn Predictor>>,
    label: Option<String>,
    version: Option<u64>,
}

impl ModelHandle {
    pub fn empty() -> Self { Self::default() }

    pub fn new(predictor: Arc<dyn Predictor>, label: impl Into<String>) -> Self {
        Self { predictor: Some(predictor), label: Some(label.into()), version: None }
    }

    pub fn is_ready(&self) -> bool { self.predictor.is_some() }

    pub fn predictor(&self) -> Result<Arc<dyn Predictor>, ApiError> {
        self.predictor.clone().ok_or(ApiError::NotReady)
    }

    pub fn label(&self) -> Option<&str> { self.label.as_deref() }

    pub fn version(&self) -> Option<u64> { self.version }
}

impl From<LoadedModel> for ModelHandle {
    fn from(model: LoadedModel) -> Self {
        Self { predictor: Some(model.predictor), label: Some(model.uri.to_string()), version: Some(model.version) }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("ready", &self.is_ready())
            .field("label", &self.label)
            .field("version", &self.version)
            .finish()
    }
}
