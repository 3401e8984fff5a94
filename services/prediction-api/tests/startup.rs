use model_registry::{fixtures, RegistryError};
use prediction_api::config::{ModelConfig, ServerConfig, ServiceConfig, DEFAULT_MODEL_URI};
use prediction_api::startup::initialize;
use std::path::Path;

fn model_config(tracking_uri: &str, cache: &Path) -> ModelConfig {
    ModelConfig {
        tracking_uri: tracking_uri.to_string(),
        model_uri: DEFAULT_MODEL_URI.to_string(),
        tracking_token: None,
        request_timeout_secs: 2,
        artifact_cache_dir: cache.to_path_buf(),
    }
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn unreachable_tracking_server_yields_no_handle() {
    let cache = tempfile::tempdir().unwrap();
    let err = initialize(&model_config(&closed_port_url(), cache.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::Unreachable { .. }), "{err}");
}

#[tokio::test]
async fn missing_file_store_yields_no_handle() {
    let cache = tempfile::tempdir().unwrap();
    let missing = cache.path().join("no-mlruns-here");
    let err = initialize(&model_config(missing.to_str().unwrap(), cache.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::Unreachable { .. }), "{err}");
}

#[tokio::test]
async fn unregistered_model_is_not_found() {
    let store = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(store.path().join("models")).unwrap();
    let err = initialize(&model_config(store.path().to_str().unwrap(), store.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::ModelNotFound { .. }), "{err}");
}

#[tokio::test]
async fn database_tracking_uri_is_rejected() {
    let cache = tempfile::tempdir().unwrap();
    let err = initialize(&model_config("sqlite:///mlflow.db", cache.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::UnsupportedTrackingUri { .. }), "{err}");
}

#[tokio::test]
async fn model_with_foreign_signature_is_refused() {
    let store = tempfile::tempdir().unwrap();
    let version_dir = store.path().join("models/StudentPerformanceModel/version-1");
    std::fs::create_dir_all(&version_dir).unwrap();
    std::fs::write(version_dir.join("meta.yaml"), "version: 1\ncurrent_stage: Production\nsource: artifacts/model\n").unwrap();
    let artifacts = store.path().join("artifacts/model");
    std::fs::create_dir_all(&artifacts).unwrap();
    std::fs::write(
        artifacts.join("MLmodel"),
        "flavors:\n  onnx:\n    data: model.onnx\nsignature:\n  inputs: '[{\"type\": \"double\", \"name\": \"Age\"}, {\"type\": \"double\", \"name\": \"Height_Cm\"}]'\n",
    )
    .unwrap();
    let err = initialize(&model_config(store.path().to_str().unwrap(), store.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::SchemaMismatch(ref msg) if msg.contains("Height_Cm")), "{err}");
}

#[tokio::test]
async fn graph_typing_a_text_field_as_integer_is_refused() {
    let store = tempfile::tempdir().unwrap();
    let graph = fixtures::age_plus_hours(&[("Class", fixtures::INT64)]);
    fixtures::register(store.path(), "StudentPerformanceModel", fixtures::ONNX_MLMODEL, &graph).unwrap();
    let err = initialize(&model_config(store.path().to_str().unwrap(), store.path())).await.unwrap_err();
    assert!(matches!(err, RegistryError::SchemaMismatch(ref msg) if msg.contains("`Class` is I64")), "{err}");
}

#[tokio::test]
async fn run_fails_before_binding_when_model_cannot_load() {
    let cache = tempfile::tempdir().unwrap();
    let reserved = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let bind_addr = reserved.local_addr().unwrap().to_string();
    drop(reserved);

    let cfg = ServiceConfig {
        server: ServerConfig { bind_addr: bind_addr.clone(), max_body_bytes: 65536, inference_timeout_ms: 2000 },
        model: model_config(&closed_port_url(), cache.path()),
    };
    let err = prediction_api::run(cfg).await.unwrap_err();
    assert!(err.downcast_ref::<RegistryError>().is_some(), "{err:#}");
    assert!(tokio::net::TcpStream::connect(&bind_addr).await.is_err());
}
