use crate::config::ModelConfig;
use crate::handle::ModelHandle;
use crate::schema::COLUMNS;
use model_registry::{ModelLoader, ModelUri, RegistryError, TrackingUri};
use tracing::info;

/// Loads the configured model once. Any error here is fatal to the process.
pub async fn initialize(cfg: &ModelConfig) -> Result<ModelHandle, RegistryError> {
    let tracking = TrackingUri::parse(&cfg.tracking_uri)?;
    let uri = ModelUri::parse(&cfg.model_uri)?;
    info!(tracking_uri = %tracking, model_uri = %uri, "model_load_started");
    let loader = ModelLoader::new(&tracking, cfg.rest_options())?;
    let loaded = loader.load(&uri, &COLUMNS).await?;
    Ok(ModelHandle::from(loaded))
}
