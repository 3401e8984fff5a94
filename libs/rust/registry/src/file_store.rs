//! Registry backed by a local MLflow file store:
//! `<root>/models/<name>/version-<n>/meta.yaml` and
//! `<root>/models/<name>/aliases/<alias>`.

use crate::error::{RegistryError, Result};
use crate::store::ModelStore;
use crate::uri::{local_artifact_path, ModelUri, VersionSelector};
use crate::version::{select, ModelVersion};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const VERSION_DIR_PREFIX: &str = "version-";
const META_FILE: &str = "meta.yaml";

#[derive(Debug, Deserialize)]
struct VersionMeta {
    version: u64,
    #[serde(default)]
    current_stage: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    storage_location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FileRegistry {
    root: PathBuf,
}

impl FileRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

    pub fn root(&self) -> &Path { &self.root }

    fn model_dir(&self, name: &str) -> PathBuf { self.root.join("models").join(name) }

    pub fn resolve_sync(&self, uri: &ModelUri) -> Result<ModelVersion> {
        if !self.root.is_dir() {
            return Err(RegistryError::Unreachable { location: self.location(), reason: "directory does not exist".into() });
        }
        let model_dir = self.model_dir(&uri.name);
        let not_found = || RegistryError::ModelNotFound { name: uri.name.clone(), selector: uri.selector.to_string() };
        if !model_dir.is_dir() {
            return Err(not_found());
        }

        let selector = match &uri.selector {
            VersionSelector::Alias(alias) => match read_alias(&model_dir, alias)? {
                Some(v) => VersionSelector::Version(v),
                None => return Err(not_found()),
            },
            other => other.clone(),
        };
        let versions = self.list_versions(&uri.name, &model_dir)?;
        debug!(model = %uri.name, versions = versions.len(), "file_store_versions_listed");
        select(&versions, &selector).cloned().ok_or_else(not_found)
    }

    fn list_versions(&self, name: &str, model_dir: &Path) -> Result<Vec<ModelVersion>> {
        let entries = std::fs::read_dir(model_dir).map_err(|e| RegistryError::io(model_dir, e))?;
        let mut versions = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RegistryError::io(model_dir, e))?;
            let is_version_dir = entry.file_name().to_str().is_some_and(|n| n.starts_with(VERSION_DIR_PREFIX));
            if !is_version_dir || !entry.path().is_dir() {
                continue;
            }
            let meta_path = entry.path().join(META_FILE);
            let text = match std::fs::read_to_string(&meta_path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(RegistryError::io(&meta_path, e)),
            };
            let meta: VersionMeta = serde_yaml::from_str(&text)
                .map_err(|e| RegistryError::InvalidArtifact(format!("{}: {e}", meta_path.display())))?;
            versions.push(ModelVersion {
                name: name.to_string(),
                version: meta.version,
                stage: meta.current_stage,
                location: meta.storage_location.or(meta.source),
            });
        }
        Ok(versions)
    }

    pub fn artifact_dir_sync(&self, version: &ModelVersion) -> Result<PathBuf> {
        let location = version
            .location
            .as_deref()
            .ok_or_else(|| RegistryError::InvalidArtifact(format!("version {} of `{}` has no source", version.version, version.name)))?;
        let path = local_artifact_path(location).ok_or_else(|| RegistryError::UnsupportedArtifactLocation(location.to_string()))?;
        Ok(if path.is_relative() { self.root.join(path) } else { path })
    }
}

fn read_alias(model_dir: &Path, alias: &str) -> Result<Option<u64>> {
    let path = model_dir.join("aliases").join(alias);
    match std::fs::read_to_string(&path) {
        Ok(text) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| RegistryError::InvalidArtifact(format!("alias file {} does not hold a version number", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RegistryError::io(&path, e)),
    }
}

#[async_trait]
impl ModelStore for FileRegistry {
    fn location(&self) -> String { self.root.display().to_string() }

    async fn resolve(&self, uri: &ModelUri) -> Result<ModelVersion> { self.resolve_sync(uri) }

    async fn artifact_dir(&self, version: &ModelVersion) -> Result<PathBuf> { self.artifact_dir_sync(version) }
}
