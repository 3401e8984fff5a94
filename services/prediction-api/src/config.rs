//! Service configuration.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use model_registry::RestOptions;
use perf_core::config::load_layered;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";
pub const TRACKING_TOKEN_ENV: &str = "MLFLOW_TRACKING_TOKEN";
pub const DEFAULT_MODEL_URI: &str = "models:/StudentPerformanceModel/Production";

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_body_bytes: usize,
    pub inference_timeout_ms: u64,
}

impl ServerConfig {
    pub fn inference_timeout(&self) -> Duration { Duration::from_millis(self.inference_timeout_ms) }
}

#[derive(Clone, Deserialize)]
pub struct ModelConfig {
    pub tracking_uri: String,
    pub model_uri: String,
    #[serde(default)]
    pub tracking_token: Option<String>,
    pub request_timeout_secs: u64,
    pub artifact_cache_dir: PathBuf,
}

impl ModelConfig {
    pub fn rest_options(&self) -> RestOptions {
        RestOptions {
            token: self.tracking_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            cache_dir: self.artifact_cache_dir.clone(),
        }
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("tracking_uri", &self.tracking_uri)
            .field("model_uri", &self.model_uri)
            .field("tracking_token", &self.tracking_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("artifact_cache_dir", &self.artifact_cache_dir)
            .finish()
    }
}

impl ServiceConfig {
    /// Defaults, then `PERF_CONFIG_FILE`, then `PERF__*`, then the MLflow
    /// tracking variables.
    pub fn load() -> Result<Self, ConfigError> {
        load_layered(Self::defaults()?, &tracking_overrides(|key| std::env::var(key).ok()))
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let cache_dir = std::env::temp_dir().join("perf-model-cache");
        Config::builder()
            .set_default("server.bind_addr", "0.0.0.0:8000")?
            .set_default("server.max_body_bytes", 64 * 1024_i64)?
            .set_default("server.inference_timeout_ms", 2000_i64)?
            .set_default("model.tracking_uri", "./mlruns")?
            .set_default("model.model_uri", DEFAULT_MODEL_URI)?
            .set_default("model.request_timeout_secs", 30_i64)?
            .set_default("model.artifact_cache_dir", cache_dir.display().to_string())
    }
}

/// Blank values count as unset.
pub fn tracking_overrides(lookup: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, Option<String>)> {
    let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
    vec![("model.tracking_uri", read(TRACKING_URI_ENV)), ("model.tracking_token", read(TRACKING_TOKEN_ENV))]
}
