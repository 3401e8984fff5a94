use crate::error::Result;
use crate::uri::ModelUri;
use crate::version::ModelVersion;
use async_trait::async_trait;
use std::path::PathBuf;

/// A model registry backend.
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Human readable location for logs and errors.
    fn location(&self) -> String;

    async fn resolve(&self, uri: &ModelUri) -> Result<ModelVersion>;

    /// Local directory holding the version's `MLmodel` and model files, fetching
    /// them first if the store is remote.
    async fn artifact_dir(&self, version: &ModelVersion) -> Result<PathBuf>;
}
