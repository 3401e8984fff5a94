use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid tracking uri `{0}`")]
    InvalidTrackingUri(String),
    #[error("unsupported tracking uri scheme `{scheme}`: use an MLflow tracking server (http/https) or a file store")]
    UnsupportedTrackingUri { scheme: String },
    #[error("invalid model uri `{uri}`: {reason}")]
    InvalidModelUri { uri: String, reason: &'static str },
    #[error("tracking store unreachable at {location}: {reason}")]
    Unreachable { location: String, reason: String },
    #[error("model `{name}` has no version matching `{selector}`")]
    ModelNotFound { name: String, selector: String },
    #[error("registry responded with status {status}: {message}")]
    Registry { status: u16, message: String },
    #[error("unsupported artifact location `{0}`")]
    UnsupportedArtifactLocation(String),
    #[error("model artifact has no onnx flavor (found: {found})")]
    UnsupportedFlavor { found: String },
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),
    #[error("model columns do not match the request schema: {0}")]
    SchemaMismatch(String),
    #[error("i/o error on {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("failed to load onnx model: {0:#}")]
    Model(anyhow::Error),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
