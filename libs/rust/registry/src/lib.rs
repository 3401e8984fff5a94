//! Resolution and loading of MLflow-registered models.
//!
//! A [`ModelLoader`] turns a `models:/` uri into a ready [`Predictor`]:
//! resolve the version in the tracking store, locate (or fetch) its artifact
//! directory, read the `MLmodel` descriptor, check its declared columns and
//! build the ONNX inference plan.

pub mod error;
pub mod file_store;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod frame;
pub mod mlmodel;
pub mod onnx;
pub mod predictor;
pub mod rest;
pub mod store;
pub mod uri;
pub mod version;

pub use error::{RegistryError, Result};
pub use file_store::FileRegistry;
pub use frame::{Cell, CellKind, Frame};
pub use mlmodel::{check_columns, check_signature, MlModel};
pub use onnx::OnnxPredictor;
pub use predictor::Predictor;
pub use rest::{RestOptions, RestRegistry};
pub use store::ModelStore;
pub use uri::{ModelUri, TrackingUri, VersionSelector};
pub use version::ModelVersion;

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// A model ready to serve.
#[derive(Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    pub version: u64,
    pub uri: ModelUri,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("version", &self.version)
            .field("uri", &self.uri.to_string())
            .finish_non_exhaustive()
    }
}

pub struct ModelLoader {
    store: Box<dyn ModelStore>,
}

impl ModelLoader {
    pub fn new(tracking: &TrackingUri, rest: RestOptions) -> Result<Self> {
        let store: Box<dyn ModelStore> = match tracking {
            TrackingUri::File(root) => Box::new(FileRegistry::new(root.clone())),
            TrackingUri::Rest(base) => Box::new(RestRegistry::new(base.clone(), rest)?),
        };
        Ok(Self { store })
    }

    /// Loads `uri`, refusing models whose signature or graph inputs name a
    /// column outside `expected`, or declare a type its values cannot take.
    pub async fn load(&self, uri: &ModelUri, expected: &[(&str, CellKind)]) -> Result<LoadedModel> {
        let started = Instant::now();
        let version = self.store.resolve(uri).await?;
        info!(model = %version.name, version = version.version, stage = ?version.stage, "model_version_resolved");

        let artifact_dir = self.store.artifact_dir(&version).await?;
        let descriptor = MlModel::read(&artifact_dir)?;
        let declared = descriptor.input_columns()?;
        if declared.is_empty() {
            warn!(model = %version.name, "model_signature_missing");
        }
        check_signature(expected, &declared)?;

        let graph_path = artifact_dir.join(descriptor.onnx_data()?);
        let predictor = tokio::task::spawn_blocking(move || OnnxPredictor::load(&graph_path))
            .await
            .map_err(|e| RegistryError::Model(anyhow::anyhow!("model loading task failed: {e}")))?
            .map_err(RegistryError::Model)?;
        check_columns(
            expected,
            predictor.inputs().iter().map(|input| (input.name.as_str(), input.datum_type)),
            |datum_type, kind| onnx::accepts(*datum_type, kind),
            "model graph",
        )?;

        info!(
            model = %version.name,
            version = version.version,
            inputs = predictor.input_names().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model_loaded"
        );
        Ok(LoadedModel {
            predictor: Arc::new(predictor),
            version: version.version,
            uri: uri.clone(),
        })
    }
}
