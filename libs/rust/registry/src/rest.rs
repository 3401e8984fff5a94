//! Registry backed by an MLflow tracking server (REST API 2.0).

use crate::error::{RegistryError, Result};
use crate::mlmodel::{MlModel, MLMODEL_FILE};
use crate::store::ModelStore;
use crate::uri::{local_artifact_path, ModelUri, VersionSelector};
use crate::version::{select, ModelVersion};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const API: &str = "/api/2.0/mlflow";
const ARTIFACT_PROXY: &str = "/api/2.0/mlflow-artifacts/artifacts";
const RESOURCE_DOES_NOT_EXIST: &str = "RESOURCE_DOES_NOT_EXIST";

#[derive(Debug, Clone)]
pub struct RestOptions {
    /// Sent as a bearer token when set.
    pub token: Option<String>,
    pub timeout: Duration,
    /// Downloaded artifacts land in `<cache_dir>/<name>/<version>/`.
    pub cache_dir: PathBuf,
}

impl Default for RestOptions {
    fn default() -> Self {
        Self { token: None, timeout: Duration::from_secs(30), cache_dir: std::env::temp_dir().join("perf-model-cache") }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VersionField { Number(u64), Text(String) }

#[derive(Debug, Deserialize)]
struct RestModelVersion {
    name: String,
    version: VersionField,
    #[serde(default)]
    current_stage: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    storage_location: Option<String>,
}

impl RestModelVersion {
    fn into_version(self) -> Result<ModelVersion> {
        let version = match self.version {
            VersionField::Number(n) => n,
            VersionField::Text(text) => text
                .parse()
                .map_err(|_| RegistryError::InvalidArtifact(format!("registry returned non-numeric version `{text}`")))?,
        };
        Ok(ModelVersion { name: self.name, version, stage: self.current_stage, location: self.storage_location.or(self.source) })
    }
}

#[derive(Debug, Deserialize)]
struct LatestVersions {
    #[serde(default)]
    model_versions: Vec<RestModelVersion>,
}

#[derive(Debug, Deserialize)]
struct ModelVersionEnvelope { model_version: RestModelVersion }

#[derive(Debug, Deserialize)]
struct DownloadUri { artifact_uri: String }

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct RestRegistry {
    base: String,
    client: Client,
    token: Option<String>,
    cache_dir: PathBuf,
}

impl RestRegistry {
    pub fn new(base: impl Into<String>, opts: RestOptions) -> Result<Self> {
        let base = base.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(opts.timeout)
            .build()
            .map_err(|e| RegistryError::Unreachable { location: base.clone(), reason: e.to_string() })?;
        Ok(Self { base, client, token: opts.token, cache_dir: opts.cache_dir })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}{API}{path}", self.base);
        let parsed = if params.is_empty() { Url::parse(&raw) } else { Url::parse_with_params(&raw, params) };
        parsed.map_err(|_| RegistryError::InvalidTrackingUri(self.base.clone()))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn unreachable(&self, err: &reqwest::Error) -> RegistryError {
        RegistryError::Unreachable { location: self.base.clone(), reason: err.to_string() }
    }

    /// `Ok(None)` when the registry reports the resource as missing.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>> {
        let resp = self.authorize(req).send().await.map_err(|e| self.unreachable(&e))?;
        let status = resp.status();
        if status.is_success() {
            return resp.json::<T>().await.map(Some).map_err(|e| RegistryError::Registry {
                status: status.as_u16(),
                message: format!("malformed response: {e}"),
            });
        }
        let body: ApiErrorBody = resp.json().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND || body.error_code.as_deref() == Some(RESOURCE_DOES_NOT_EXIST) {
            return Ok(None);
        }
        Err(RegistryError::Registry { status: status.as_u16(), message: body.message.unwrap_or_else(|| status.to_string()) })
    }

    async fn latest_versions(&self, name: &str, stage: Option<&str>) -> Result<Vec<ModelVersion>> {
        let url = self.endpoint("/registered-models/get-latest-versions", &[])?;
        let body = match stage {
            Some(stage) => json!({ "name": name, "stages": [stage] }),
            None => json!({ "name": name }),
        };
        let found: Option<LatestVersions> = self.send(self.client.post(url).json(&body)).await?;
        found
            .map(|l| l.model_versions)
            .unwrap_or_default()
            .into_iter()
            .map(RestModelVersion::into_version)
            .collect()
    }

    async fn single_version(&self, path: &str, params: &[(&str, &str)]) -> Result<Option<ModelVersion>> {
        let url = self.endpoint(path, params)?;
        let found: Option<ModelVersionEnvelope> = self.send(self.client.get(url)).await?;
        found.map(|env| env.model_version.into_version()).transpose()
    }

    /// Artifact proxy path for remote artifact uris this server can serve.
    fn proxy_path(&self, artifact_uri: &str) -> Option<String> {
        if let Some(rest) = artifact_uri.strip_prefix("mlflow-artifacts:") {
            let path = match rest.strip_prefix("//") {
                Some(after) => &after[after.find('/')?..],
                None => rest,
            };
            return Some(path.trim_matches('/').to_string());
        }
        let proxy_prefix = format!("{}{ARTIFACT_PROXY}", self.base);
        artifact_uri.strip_prefix(proxy_prefix.as_str()).map(|p| p.trim_matches('/').to_string())
    }

    async fn download(&self, remote: &str, version: &ModelVersion) -> Result<PathBuf> {
        let dir = self.cache_dir.join(cache_segment(&version.name)?).join(version.version.to_string());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| RegistryError::io(&dir, e))?;
        let descriptor = self.fetch_artifact(remote, MLMODEL_FILE, &dir).await?;
        let text = String::from_utf8(descriptor).map_err(|_| RegistryError::InvalidArtifact(format!("{MLMODEL_FILE} is not utf-8")))?;
        let data = MlModel::parse(&text)?.onnx_data()?.to_string();
        self.fetch_artifact(remote, &data, &dir).await?;
        info!(model = %version.name, version = version.version, dir = %dir.display(), "artifacts_downloaded");
        Ok(dir)
    }

    async fn fetch_artifact(&self, remote: &str, file: &str, dir: &Path) -> Result<Vec<u8>> {
        let relative = Path::new(file);
        if relative.components().any(|c| !matches!(c, Component::Normal(_))) {
            return Err(RegistryError::InvalidArtifact(format!("artifact file name `{file}` escapes the artifact directory")));
        }
        let url = if remote.is_empty() {
            format!("{}{ARTIFACT_PROXY}/{file}", self.base)
        } else {
            format!("{}{ARTIFACT_PROXY}/{remote}/{file}", self.base)
        };
        debug!(%url, "artifact_fetch");
        let resp = self.authorize(self.client.get(&url)).send().await.map_err(|e| self.unreachable(&e))?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::InvalidArtifact(format!("artifact `{file}` not found under `{remote}`")));
        }
        if !status.is_success() {
            return Err(RegistryError::Registry { status: status.as_u16(), message: format!("download of `{file}` failed") });
        }
        let bytes = resp.bytes().await.map_err(|e| self.unreachable(&e))?;
        let target = dir.join(relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| RegistryError::io(parent, e))?;
        }
        tokio::fs::write(&target, &bytes).await.map_err(|e| RegistryError::io(&target, e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ModelStore for RestRegistry {
    fn location(&self) -> String { self.base.clone() }

    async fn resolve(&self, uri: &ModelUri) -> Result<ModelVersion> {
        let name = uri.name.as_str();
        let found = match &uri.selector {
            VersionSelector::Stage(stage) => {
                let versions = self.latest_versions(name, Some(stage)).await?;
                select(&versions, &uri.selector).cloned()
            }
            VersionSelector::Latest => {
                let versions = self.latest_versions(name, None).await?;
                select(&versions, &uri.selector).cloned()
            }
            VersionSelector::Version(n) => {
                let n = n.to_string();
                self.single_version("/model-versions/get", &[("name", name), ("version", n.as_str())]).await?
            }
            VersionSelector::Alias(alias) => {
                self.single_version("/registered-models/alias", &[("name", name), ("alias", alias.as_str())]).await?
            }
        };
        found.ok_or_else(|| RegistryError::ModelNotFound { name: uri.name.clone(), selector: uri.selector.to_string() })
    }

    async fn artifact_dir(&self, version: &ModelVersion) -> Result<PathBuf> {
        let v = version.version.to_string();
        let url = self.endpoint("/model-versions/get-download-uri", &[("name", version.name.as_str()), ("version", v.as_str())])?;
        let found: Option<DownloadUri> = self.send(self.client.get(url)).await?;
        let artifact_uri = found
            .ok_or_else(|| RegistryError::ModelNotFound { name: version.name.clone(), selector: v.clone() })?
            .artifact_uri;
        if let Some(path) = local_artifact_path(&artifact_uri) {
            return Ok(path);
        }
        let remote = self
            .proxy_path(&artifact_uri)
            .ok_or_else(|| RegistryError::UnsupportedArtifactLocation(artifact_uri.clone()))?;
        self.download(&remote, version).await
    }
}

/// Model names become cache directory names only when they are a single plain
/// path component.
fn cache_segment(name: &str) -> Result<&str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(RegistryError::InvalidArtifact(format!("model name `{name}` cannot be used as a cache directory"))),
    }
}
